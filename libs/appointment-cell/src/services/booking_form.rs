// libs/appointment-cell/src/services/booking_form.rs
//! Booking form state for the center → service → date → time selection.
//!
//! The state is never mutated in place: [`reduce`] takes the current state and
//! an action and returns the next one. Selection changes that alter the
//! availability query bump `generation`, so an availability answer that was
//! requested for an older selection can be recognised and dropped.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AvailabilityResult, BookingQuery, CreateAppointmentRequest, TimeSlot};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Select a health center first")]
    MissingHealthCenter,

    #[error("Select a service first")]
    MissingService,

    #[error("Select a date first")]
    MissingDate,

    #[error("Select a time first")]
    MissingTime,

    #[error("Availability for the selected date is still loading")]
    AvailabilityPending,

    #[error("{0} is already booked")]
    SlotUnavailable(TimeSlot),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BookingFormState {
    pub health_center_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub time: Option<TimeSlot>,
    pub notes: Option<String>,
    pub generation: u64,
    pub availability: Option<AvailabilityResult>,
    pub last_error: Option<String>,
    pub submitted: Option<Appointment>,
}

#[derive(Debug, Clone)]
pub enum BookingAction {
    SelectHealthCenter(Uuid),
    SelectService(Uuid),
    SelectDate(NaiveDate),
    AvailabilityLoaded { generation: u64, result: AvailabilityResult },
    SelectTime(TimeSlot),
    SetNotes(Option<String>),
    SubmissionFailed { message: String },
    SubmissionSucceeded(Appointment),
    Reset,
}

impl BookingFormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The availability lookup for the current selection, once center, service and date are set.
    pub fn to_booking_query(&self) -> Option<BookingQuery> {
        match (self.health_center_id, self.service_id, self.date) {
            (Some(center), Some(_), Some(date)) => Some(BookingQuery::new(center, date)),
            _ => None,
        }
    }

    pub fn to_create_request(&self, patient_id: Uuid) -> Result<CreateAppointmentRequest, FormError> {
        let health_center_id = self.health_center_id.ok_or(FormError::MissingHealthCenter)?;
        let service_id = self.service_id.ok_or(FormError::MissingService)?;
        let appointment_date = self.date.ok_or(FormError::MissingDate)?;
        let time = self.time.clone().ok_or(FormError::MissingTime)?;

        Ok(CreateAppointmentRequest {
            patient_id,
            health_center_id,
            service_id,
            appointment_date,
            time,
            notes: self.notes.clone(),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.health_center_id.is_some()
            && self.service_id.is_some()
            && self.date.is_some()
            && self.time.is_some()
    }

    /// A new selection invalidates any availability in flight or on screen.
    fn next_generation(mut self) -> Self {
        self.generation += 1;
        self.availability = None;
        self.time = None;
        self.last_error = None;
        self.submitted = None;
        self
    }
}

pub fn reduce(state: &BookingFormState, action: BookingAction) -> Result<BookingFormState, FormError> {
    let mut next = state.clone();

    match action {
        BookingAction::SelectHealthCenter(center) => {
            next = next.next_generation();
            if state.health_center_id != Some(center) {
                next.service_id = None;
                next.date = None;
            }
            next.health_center_id = Some(center);
        }
        BookingAction::SelectService(service) => {
            if state.health_center_id.is_none() {
                return Err(FormError::MissingHealthCenter);
            }
            next = next.next_generation();
            next.service_id = Some(service);
        }
        BookingAction::SelectDate(date) => {
            if state.service_id.is_none() {
                return Err(FormError::MissingService);
            }
            next = next.next_generation();
            next.date = Some(date);
        }
        BookingAction::AvailabilityLoaded { generation, result } => {
            if generation != state.generation {
                debug!(
                    "Discarding availability for generation {} (current {})",
                    generation, state.generation
                );
                return Ok(next);
            }
            if let Some(time) = &state.time {
                if !result.is_available(time) {
                    next.time = None;
                }
            }
            next.availability = Some(result);
        }
        BookingAction::SelectTime(slot) => {
            if state.date.is_none() {
                return Err(FormError::MissingDate);
            }
            let availability = state.availability.as_ref().ok_or(FormError::AvailabilityPending)?;
            if !availability.is_available(&slot) {
                return Err(FormError::SlotUnavailable(slot));
            }
            next.time = Some(slot);
            next.last_error = None;
        }
        BookingAction::SetNotes(notes) => {
            next.notes = notes.filter(|n| !n.trim().is_empty());
        }
        BookingAction::SubmissionFailed { message } => {
            // Keep everything the user picked except the rejected time.
            next.time = None;
            next.last_error = Some(message);
        }
        BookingAction::SubmissionSucceeded(appointment) => {
            next.last_error = None;
            next.submitted = Some(appointment);
        }
        BookingAction::Reset => {
            next = BookingFormState {
                generation: state.generation + 1,
                ..BookingFormState::default()
            };
        }
    }

    Ok(next)
}

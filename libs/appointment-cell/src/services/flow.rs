// libs/appointment-cell/src/services/flow.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{Appointment, AppointmentError, AvailabilityResult, BookingQuery, TimeSlot};
use crate::services::availability::AvailabilityService;
use crate::services::booking::AppointmentBookingService;
use crate::services::booking_form::{reduce, BookingAction, BookingFormState, FormError};

/// Drives one booking screen: owns the form state and issues the backend calls
/// each selection needs.
pub struct BookingFlow {
    availability: Arc<AvailabilityService>,
    booking: Arc<AppointmentBookingService>,
    auth_token: String,
    state: BookingFormState,
}

impl BookingFlow {
    pub fn new(
        availability: Arc<AvailabilityService>,
        booking: Arc<AppointmentBookingService>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            availability,
            booking,
            auth_token: auth_token.into(),
            state: BookingFormState::new(),
        }
    }

    pub fn state(&self) -> &BookingFormState {
        &self.state
    }

    pub fn dispatch(&mut self, action: BookingAction) -> Result<(), FormError> {
        self.state = reduce(&self.state, action)?;
        Ok(())
    }

    pub async fn select_health_center(&mut self, health_center_id: Uuid) -> Result<(), FormError> {
        self.dispatch(BookingAction::SelectHealthCenter(health_center_id))?;
        self.refresh_availability().await?;
        Ok(())
    }

    pub async fn select_service(&mut self, service_id: Uuid) -> Result<(), FormError> {
        self.dispatch(BookingAction::SelectService(service_id))?;
        self.refresh_availability().await?;
        Ok(())
    }

    pub async fn select_date(&mut self, date: NaiveDate) -> Result<(), FormError> {
        self.dispatch(BookingAction::SelectDate(date))?;
        self.refresh_availability().await?;
        Ok(())
    }

    pub fn select_time(&mut self, slot: TimeSlot) -> Result<(), FormError> {
        self.dispatch(BookingAction::SelectTime(slot))
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> Result<(), FormError> {
        self.dispatch(BookingAction::SetNotes(notes))
    }

    /// Snapshot of what to fetch, tagged with the generation it belongs to.
    pub fn begin_availability_request(&self) -> Option<(u64, BookingQuery)> {
        self.state
            .to_booking_query()
            .map(|query| (self.state.generation, query))
    }

    /// Applies a lookup result; answers for an older generation are ignored.
    pub fn apply_availability(
        &mut self,
        generation: u64,
        result: AvailabilityResult,
    ) -> Result<bool, FormError> {
        let applied = generation == self.state.generation;
        self.dispatch(BookingAction::AvailabilityLoaded { generation, result })?;
        Ok(applied)
    }

    /// Fetches availability for the current selection, if it is complete enough.
    pub async fn refresh_availability(&mut self) -> Result<Option<&AvailabilityResult>, FormError> {
        let Some((generation, query)) = self.begin_availability_request() else {
            return Ok(None);
        };
        let result = self.availability.resolve(&query, &self.auth_token).await;
        if !self.apply_availability(generation, result)? {
            debug!("Availability for generation {} arrived late", generation);
        }
        Ok(self.state.availability.as_ref())
    }

    /// Submits the selected slot.
    ///
    /// Creation is attempted whenever a time is selected; the backend decides.
    /// A rejection is recorded on the form and returned for display; a taken
    /// slot also reloads availability so it shows as booked.
    pub async fn submit(&mut self, patient_id: Uuid) -> Result<Appointment, AppError> {
        let request = self
            .state
            .to_create_request(patient_id)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        match self.booking.book_appointment(request, &self.auth_token).await {
            Ok(appointment) => {
                info!("Booked appointment {}", appointment.id);
                self.dispatch(BookingAction::SubmissionSucceeded(appointment.clone()))
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                Ok(appointment)
            }
            Err(e) => {
                warn!("Booking rejected: {}", e);
                let message = e.user_message();
                self.dispatch(BookingAction::SubmissionFailed { message })
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                if e == AppointmentError::SlotNotAvailable {
                    self.refresh_availability()
                        .await
                        .map_err(|e| AppError::Internal(e.to_string()))?;
                }
                Err(e.into())
            }
        }
    }
}

// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;
use std::str::FromStr;

use shared_models::error::AppError;

// ==============================================================================
// SLOT GRID
// ==============================================================================

/// Daily start times offered by every health center, in chronological order.
const STANDARD_SLOT_TIMES: [&str; 19] = [
    "08:00", "08:30", "09:00", "09:30", "10:00", "10:30", "11:00", "11:30",
    "12:00", "12:30", "13:00", "13:30", "14:00", "14:30", "15:00", "15:30",
    "16:00", "16:30", "17:00",
];

/// A wall-clock appointment start time, always rendered as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(String);

impl TimeSlot {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts `HH:MM` and the `HH:MM:SS` form returned by `time` columns.
    pub fn parse(raw: &str) -> Result<Self, AppointmentError> {
        let trimmed = raw.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| AppointmentError::InvalidTime(raw.to_string()))?;
        Ok(Self(time.format("%H:%M").to_string()))
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TimeSlot {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = AppointmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.0
    }
}

/// Ordered set of bookable start times for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    slots: Vec<TimeSlot>,
}

impl SlotGrid {
    pub fn standard() -> Self {
        let slots = STANDARD_SLOT_TIMES
            .iter()
            .map(|raw| TimeSlot(raw.to_string()))
            .collect();
        Self { slots }
    }

    /// Builds a grid from arbitrary times, dropping unparsable and repeated entries.
    pub fn from_slots<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut slots: Vec<TimeSlot> = Vec::new();
        for slot in raw.into_iter().filter_map(|s| TimeSlot::parse(s.as_ref()).ok()) {
            if !slots.contains(&slot) {
                slots.push(slot);
            }
        }
        Self { slots }
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self::standard()
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments hold their slot.
    pub fn is_occupying(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn occupying() -> Vec<AppointmentStatus> {
        vec![AppointmentStatus::Confirmed, AppointmentStatus::Pending]
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The part of an appointment row the availability lookup needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub time: TimeSlot,
    pub status: AppointmentStatus,
}

impl AppointmentRecord {
    pub fn new(time: TimeSlot, status: AppointmentStatus) -> Self {
        Self { time, status }
    }

    /// Returns `None` for rows missing `time` or `status`, or carrying values we don't know.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub health_center_id: Uuid,
    pub service_id: Uuid,
    pub appointment_date: NaiveDate,
    pub time: TimeSlot,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// QUERY / REQUEST MODELS
// ==============================================================================

/// Scope of one availability lookup: a health center on a given local date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingQuery {
    pub health_center_id: Uuid,
    pub date: NaiveDate,
    pub statuses: Vec<AppointmentStatus>,
}

impl BookingQuery {
    pub fn new(health_center_id: Uuid, date: NaiveDate) -> Self {
        Self {
            health_center_id,
            date,
            statuses: AppointmentStatus::occupying(),
        }
    }

    pub fn to_path(&self) -> String {
        let statuses = self
            .statuses
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "/rest/v1/appointments?select=time,status&health_center_id=eq.{}&appointment_date=eq.{}&status=in.({})",
            self.health_center_id,
            self.date.format("%Y-%m-%d"),
            statuses
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub health_center_id: Uuid,
    pub service_id: Uuid,
    pub appointment_date: NaiveDate,
    pub time: TimeSlot,
    pub notes: Option<String>,
}

// ==============================================================================
// AVAILABILITY RESULT
// ==============================================================================

/// Partition of a slot grid into taken and free start times, both in grid order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AvailabilityResult {
    pub booked: Vec<TimeSlot>,
    pub available: Vec<TimeSlot>,
    /// Set when the lookup failed and every slot was offered anyway.
    pub fail_open: bool,
}

impl AvailabilityResult {
    pub fn fail_open(grid: &SlotGrid) -> Self {
        Self {
            booked: Vec::new(),
            available: grid.slots().to_vec(),
            fail_open: true,
        }
    }

    pub fn is_available(&self, slot: &TimeSlot) -> bool {
        self.available.contains(slot)
    }

    pub fn is_booked(&self, slot: &TimeSlot) -> bool {
        self.booked.contains(slot)
    }

    pub fn total_slots(&self) -> usize {
        self.booked.len() + self.available.len()
    }
}

// ==============================================================================
// VALIDATION
// ==============================================================================

#[derive(Debug, Clone)]
pub struct BookingValidationRules {
    pub max_advance_booking_days: i64,
    pub max_notes_length: usize,
}

impl Default for BookingValidationRules {
    fn default() -> Self {
        Self {
            max_advance_booking_days: 90,
            max_notes_length: 500,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment slot not available")]
    SlotNotAvailable,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),
}

impl AppointmentError {
    pub fn user_message(&self) -> String {
        match self {
            AppointmentError::SlotNotAvailable => {
                "This time slot is no longer available. Please choose another time.".to_string()
            }
            AppointmentError::NotFound => "The appointment could not be found.".to_string(),
            AppointmentError::InvalidTime(raw) => format!("'{}' is not a valid appointment time.", raw),
            AppointmentError::InvalidStatusTransition(status) => {
                format!("A {} appointment can no longer be changed.", status)
            }
            AppointmentError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            AppointmentError::ValidationError(msg) => msg.clone(),
            AppointmentError::DatabaseError(_) | AppointmentError::ExternalServiceError(_) => {
                "We could not reach the booking service. Please try again.".to_string()
            }
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.user_message();
        match err {
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::SlotNotAvailable => AppError::Conflict(message),
            AppointmentError::InvalidTime(_) | AppointmentError::ValidationError(_) => {
                AppError::ValidationError(message)
            }
            AppointmentError::InvalidStatusTransition(_) => AppError::BadRequest(message),
            AppointmentError::Unauthorized => AppError::Auth(message),
            AppointmentError::DatabaseError(_) => AppError::Internal(message),
            AppointmentError::ExternalServiceError(_) => AppError::ExternalService(message),
        }
    }
}

// libs/appointment-cell/src/lib.rs
//! # Appointment Cell
//!
//! Client-side booking for health-center appointments.
//!
//! ```text
//! models.rs              | slot grid, records, requests, errors
//! services/availability  | free/booked partition of the slot grid
//! services/booking       | creation, lookup and cancellation calls
//! services/booking_form  | immutable form state and its reducer
//! services/flow          | drives the form against the backend
//! services/lifecycle     | allowed status transitions
//! ```
//!
//! Availability is advisory. The backend's answer to the creation call is the
//! only double-booking check.

pub mod models;
pub mod services;

pub use models::*;
pub use services::availability::{
    compute_availability, compute_availability_from_values, AppointmentQuery, AvailabilityService,
    SupabaseAppointmentQuery,
};
pub use services::booking::AppointmentBookingService;
pub use services::booking_form::{reduce, BookingAction, BookingFormState, FormError};
pub use services::flow::BookingFlow;

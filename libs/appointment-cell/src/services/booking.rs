// libs/appointment-cell/src/services/booking.rs
use chrono::{Duration, Local, NaiveDate, Utc};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use std::sync::Arc;

use shared_database::supabase::{ApiError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentStatus, AppointmentError, BookingValidationRules,
    CreateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    lifecycle_service: AppointmentLifecycleService,
    validation_rules: BookingValidationRules,
}

impl AppointmentBookingService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self::with_rules(supabase, BookingValidationRules::default())
    }

    pub fn with_rules(supabase: Arc<SupabaseClient>, validation_rules: BookingValidationRules) -> Self {
        Self {
            supabase,
            lifecycle_service: AppointmentLifecycleService::new(),
            validation_rules,
        }
    }

    /// Creates a pending appointment.
    ///
    /// Client-side availability is not consulted here; the backend is the only
    /// place a double booking is rejected, and that rejection comes back as
    /// [`AppointmentError::SlotNotAvailable`].
    pub async fn book_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment for patient {} at center {} on {} {}",
              request.patient_id, request.health_center_id, request.appointment_date, request.time);

        self.validate_booking_request(&request, Local::now().date_naive())?;

        let appointment_data = json!({
            "patient_id": request.patient_id,
            "health_center_id": request.health_center_id,
            "service_id": request.service_id,
            "appointment_date": request.appointment_date.format("%Y-%m-%d").to_string(),
            "time": request.time.as_str(),
            "status": AppointmentStatus::Pending,
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(return_representation()),
        ).await.map_err(|e| {
            let mapped = map_api_error(e);
            if mapped == AppointmentError::SlotNotAvailable {
                warn!("Slot {} on {} was taken before submission", request.time, request.appointment_date);
            }
            mapped
        })?;

        let appointment = first_appointment(result)?;
        info!("Appointment {} booked for {} {}", appointment.id, appointment.appointment_date, appointment.time);
        Ok(appointment)
    }

    /// Get appointment by ID
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(map_api_error)?;

        first_appointment(result)
    }

    pub async fn list_patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for patient {}", patient_id);

        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appointment_date.asc,time.asc",
            patient_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(map_api_error)?;

        let mut appointments = Vec::with_capacity(result.len());
        for row in result {
            match serde_json::from_value::<Appointment>(row) {
                Ok(appointment) => appointments.push(appointment),
                Err(e) => warn!("Skipping unreadable appointment row: {}", e),
            }
        }

        Ok(appointments)
    }

    /// Cancels a pending or confirmed appointment, which frees its slot.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle_service.validate_status_transition(
            &current.status,
            &AppointmentStatus::Cancelled,
        )?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "status": AppointmentStatus::Cancelled,
                "updated_at": Utc::now().to_rfc3339(),
            })),
            Some(return_representation()),
        ).await.map_err(map_api_error)?;

        let cancelled = first_appointment(result)?;
        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    pub fn validate_booking_request(
        &self,
        request: &CreateAppointmentRequest,
        today: NaiveDate,
    ) -> Result<(), AppointmentError> {
        if request.appointment_date < today {
            return Err(AppointmentError::ValidationError(
                "Appointments cannot be booked in the past".to_string(),
            ));
        }

        let last_bookable = today + Duration::days(self.validation_rules.max_advance_booking_days);
        if request.appointment_date > last_bookable {
            return Err(AppointmentError::ValidationError(format!(
                "Appointments can be booked at most {} days ahead",
                self.validation_rules.max_advance_booking_days
            )));
        }

        if let Some(notes) = &request.notes {
            if notes.chars().count() > self.validation_rules.max_notes_length {
                return Err(AppointmentError::ValidationError(format!(
                    "Notes cannot exceed {} characters",
                    self.validation_rules.max_notes_length
                )));
            }
        }

        Ok(())
    }
}

fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn first_appointment(rows: Vec<Value>) -> Result<Appointment, AppointmentError> {
    let row = rows.into_iter().next().ok_or(AppointmentError::NotFound)?;
    serde_json::from_value(row)
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
}

fn map_api_error(err: ApiError) -> AppointmentError {
    match err {
        ApiError::Conflict(_) => AppointmentError::SlotNotAvailable,
        ApiError::Auth(_) => AppointmentError::Unauthorized,
        ApiError::NotFound(_) => AppointmentError::NotFound,
        e if e.is_transient() => AppointmentError::ExternalServiceError(e.to_string()),
        e => AppointmentError::DatabaseError(e.to_string()),
    }
}

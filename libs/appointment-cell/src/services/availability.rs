// libs/appointment-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use shared_database::supabase::{ApiError, SupabaseClient};

use crate::models::{AppointmentRecord, AvailabilityResult, BookingQuery, SlotGrid, TimeSlot};

/// Partitions `grid` into booked and available slots.
///
/// Only records with an occupying status (`pending`, `confirmed`) mark a slot
/// as booked, whatever filter the backend was asked to apply. Both halves keep
/// the grid's order, and every grid slot lands in exactly one of them.
pub fn compute_availability(grid: &SlotGrid, existing: &[AppointmentRecord]) -> AvailabilityResult {
    let occupied: HashSet<&TimeSlot> = existing
        .iter()
        .filter(|record| record.status.is_occupying())
        .map(|record| &record.time)
        .collect();

    let (booked, available): (Vec<TimeSlot>, Vec<TimeSlot>) = grid
        .slots()
        .iter()
        .cloned()
        .partition(|slot| occupied.contains(slot));

    AvailabilityResult {
        booked,
        available,
        fail_open: false,
    }
}

/// Same as [`compute_availability`] over raw rows; rows that don't decode are skipped.
pub fn compute_availability_from_values(grid: &SlotGrid, rows: &[Value]) -> AvailabilityResult {
    let records: Vec<AppointmentRecord> = rows
        .iter()
        .filter_map(|row| {
            let record = AppointmentRecord::from_value(row);
            if record.is_none() {
                debug!("Skipping malformed appointment record: {}", row);
            }
            record
        })
        .collect();

    compute_availability(grid, &records)
}

/// Read side of the appointments backend used for availability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentQuery: Send + Sync {
    async fn fetch_appointments(
        &self,
        query: &BookingQuery,
        auth_token: &str,
    ) -> Result<Vec<Value>, ApiError>;
}

pub struct SupabaseAppointmentQuery {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentQuery {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AppointmentQuery for SupabaseAppointmentQuery {
    async fn fetch_appointments(
        &self,
        query: &BookingQuery,
        auth_token: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let path = query.to_path();
        self.supabase
            .request::<Vec<Value>>(Method::GET, &path, Some(auth_token), None)
            .await
    }
}

pub struct AvailabilityService {
    query: Arc<dyn AppointmentQuery>,
    grid: SlotGrid,
}

impl AvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self::with_query(Arc::new(SupabaseAppointmentQuery::new(supabase)), SlotGrid::standard())
    }

    pub fn with_query(query: Arc<dyn AppointmentQuery>, grid: SlotGrid) -> Self {
        Self { query, grid }
    }

    /// Looks up the taken slots for a center and date.
    ///
    /// Never fails: when the backend can't answer, every slot is reported free
    /// and the result is flagged `fail_open`. Creation stays the authoritative check.
    pub async fn resolve(&self, query: &BookingQuery, auth_token: &str) -> AvailabilityResult {
        debug!(
            "Resolving availability for center {} on {}",
            query.health_center_id, query.date
        );

        match self.query.fetch_appointments(query, auth_token).await {
            Ok(rows) => {
                let result = compute_availability_from_values(&self.grid, &rows);
                info!(
                    "Center {} on {}: {} booked, {} available",
                    query.health_center_id,
                    query.date,
                    result.booked.len(),
                    result.available.len()
                );
                result
            }
            Err(e) => {
                warn!(
                    "Availability lookup failed for center {} on {}, offering all slots: {}",
                    query.health_center_id, query.date, e
                );
                AvailabilityResult::fail_open(&self.grid)
            }
        }
    }
}

use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub request_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            request_timeout_secs: 2,
        }
    }
}

impl TestConfig {
    /// Points the config at a mock server.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            supabase_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub access_token: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient()
    }
}

impl TestUser {
    pub fn patient() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            access_token: format!("test-token-{}", id.simple()),
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// A row as returned by the availability select (`time,status`).
    pub fn appointment_record(time: &str, status: &str) -> serde_json::Value {
        json!({
            "time": time,
            "status": status
        })
    }

    pub fn appointment_response(
        appointment_id: Uuid,
        patient_id: Uuid,
        health_center_id: Uuid,
        date: NaiveDate,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "health_center_id": health_center_id,
            "service_id": Uuid::new_v4(),
            "appointment_date": date.format("%Y-%m-%d").to_string(),
            "time": time,
            "status": status,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    /// PostgREST error body.
    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "code": code,
            "details": null,
            "hint": null,
            "message": message
        })
    }

    pub fn slot_taken_response() -> serde_json::Value {
        Self::error_response(
            "duplicate key value violates unique constraint \"appointments_center_date_time_key\"",
            "23505",
        )
    }
}

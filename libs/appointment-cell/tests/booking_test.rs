use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Local, NaiveDate};
use serde_json::json;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};

use appointment_cell::models::{AppointmentError, AppointmentStatus, CreateAppointmentRequest, SlotGrid, TimeSlot};
use appointment_cell::services::availability::{AvailabilityService, SupabaseAppointmentQuery};
use appointment_cell::services::booking::AppointmentBookingService;
use appointment_cell::services::flow::BookingFlow;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser, MockSupabaseResponses};

fn booking_date() -> NaiveDate {
    Local::now().date_naive() + Duration::days(7)
}

fn slot(raw: &str) -> TimeSlot {
    TimeSlot::parse(raw).unwrap()
}

fn supabase_for(mock_server: &MockServer) -> Arc<SupabaseClient> {
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();
    Arc::new(SupabaseClient::new(&config).unwrap())
}

fn flow_for(mock_server: &MockServer, user: &TestUser) -> BookingFlow {
    let supabase = supabase_for(mock_server);
    let availability = AvailabilityService::with_query(
        Arc::new(SupabaseAppointmentQuery::new(Arc::clone(&supabase))),
        SlotGrid::from_slots(["08:00", "08:30", "09:00"]),
    );
    let booking = AppointmentBookingService::new(supabase);
    BookingFlow::new(Arc::new(availability), Arc::new(booking), user.access_token.clone())
}

fn create_request(patient_id: Uuid, time: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_id,
        health_center_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        appointment_date: booking_date(),
        time: slot(time),
        notes: Some("Follow-up on blood pressure".to_string()),
    }
}

#[tokio::test]
async fn test_book_appointment_success() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();
    let request = create_request(user.id, "09:00");
    let appointment_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "patient_id": user.id,
            "time": "09:00",
            "status": "pending",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, user.id, request.health_center_id, booking_date(), "09:00:00", "pending",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let appointment = service.book_appointment(request, &user.access_token).await.unwrap();

    assert_eq!(appointment.id, appointment_id);
    assert_eq!(appointment.time, slot("09:00"));
    assert_eq!(appointment.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_book_appointment_conflict_is_reported() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::slot_taken_response()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let result = service
        .book_appointment(create_request(user.id, "08:30"), &user.access_token)
        .await;

    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));
}

#[tokio::test]
async fn test_book_appointment_validation_skips_backend() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut request = create_request(user.id, "08:30");
    request.appointment_date = Local::now().date_naive() - Duration::days(1);

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let result = service.book_appointment(request, &user.access_token).await;

    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn test_book_appointment_backend_down() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let result = service
        .book_appointment(create_request(user.id, "08:30"), &user.access_token)
        .await;

    let err = tokio_test::assert_err!(result);
    assert_matches!(err, AppointmentError::ExternalServiceError(_));
}

#[tokio::test]
async fn test_flow_attempts_creation_and_surfaces_conflict() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();
    let center = Uuid::new_v4();
    let service_id = Uuid::new_v4();

    // First lookup: 09:00 looks free.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("health_center_id", format!("eq.{}", center)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    // After the rejected submission the lookup shows it taken.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("health_center_id", format!("eq.{}", center)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_record("09:00:00", "pending")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::slot_taken_response()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut flow = flow_for(&mock_server, &user);
    flow.select_health_center(center).await.unwrap();
    flow.select_service(service_id).await.unwrap();
    flow.select_date(booking_date()).await.unwrap();

    assert!(flow.state().availability.as_ref().unwrap().is_available(&slot("09:00")));
    flow.select_time(slot("09:00")).unwrap();
    flow.set_notes(Some("Bring vaccination card".to_string())).unwrap();

    let result = flow.submit(user.id).await;

    let err = result.unwrap_err();
    assert_matches!(err, AppError::Conflict(_));
    assert!(err.is_actionable());

    let state = flow.state();
    assert_eq!(state.health_center_id, Some(center));
    assert_eq!(state.service_id, Some(service_id));
    assert_eq!(state.date, Some(booking_date()));
    assert_eq!(state.notes.as_deref(), Some("Bring vaccination card"));
    assert!(state.time.is_none());
    assert_eq!(state.last_error.as_deref(), Some(err.user_message()));
    assert!(state.availability.as_ref().unwrap().is_booked(&slot("09:00")));

    // The user can pick another slot straight away.
    flow.select_time(slot("08:30")).unwrap();
    assert!(flow.state().is_complete());
}

#[tokio::test]
async fn test_flow_books_after_fail_open_lookup() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();
    let center = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                Uuid::new_v4(), user.id, center, booking_date(), "08:00", "pending",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut flow = flow_for(&mock_server, &user);
    flow.select_health_center(center).await.unwrap();
    flow.select_service(Uuid::new_v4()).await.unwrap();
    flow.select_date(booking_date()).await.unwrap();

    let availability = flow.state().availability.clone().unwrap();
    assert!(availability.fail_open);
    assert_eq!(availability.available.len(), 3);

    flow.select_time(slot("08:00")).unwrap();
    let appointment = flow.submit(user.id).await.unwrap();

    assert_eq!(appointment.health_center_id, center);
    assert_eq!(flow.state().submitted.as_ref().map(|a| a.id), Some(appointment.id));
    assert!(flow.state().last_error.is_none());
}

#[tokio::test]
async fn test_flow_ignores_late_availability() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let mut flow = flow_for(&mock_server, &user);
    flow.select_health_center(Uuid::new_v4()).await.unwrap();
    flow.select_service(Uuid::new_v4()).await.unwrap();
    flow.select_date(booking_date()).await.unwrap();

    let (old_generation, _query) = flow.begin_availability_request().unwrap();
    flow.select_date(booking_date() + Duration::days(1)).await.unwrap();

    let mut stale = flow.state().availability.clone().unwrap();
    stale.booked = stale.available.drain(..).collect();

    assert!(!flow.apply_availability(old_generation, stale.clone()).unwrap());
    let current = flow.state().availability.as_ref().unwrap();
    assert!(current.booked.is_empty());
    assert_eq!(current.available.len(), 3);

    let (current_generation, _query) = flow.begin_availability_request().unwrap();
    assert!(flow.apply_availability(current_generation, stale).unwrap());
    assert_eq!(flow.state().availability.as_ref().unwrap().booked.len(), 3);
}

#[tokio::test]
async fn test_flow_submit_without_time_is_rejected_locally() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut flow = flow_for(&mock_server, &user);
    let result = flow.submit(user.id).await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_cancel_pending_appointment() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();
    let appointment_id = Uuid::new_v4();
    let center = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, user.id, center, booking_date(), "10:00", "pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, user.id, center, booking_date(), "10:00", "cancelled",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let cancelled = service.cancel_appointment(appointment_id, &user.access_token).await.unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(!cancelled.status.is_occupying());
}

#[tokio::test]
async fn test_cancel_completed_appointment_rejected() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, user.id, Uuid::new_v4(), booking_date(), "10:00", "completed",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let result = service.cancel_appointment(appointment_id, &user.access_token).await;

    assert_matches!(
        result,
        Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Completed))
    );
}

#[tokio::test]
async fn test_get_missing_appointment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let result = service.get_appointment(Uuid::new_v4(), "token").await;

    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_list_patient_appointments_skips_unreadable_rows() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient();
    let center = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", user.id)))
        .and(query_param("order", "appointment_date.asc,time.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                Uuid::new_v4(), user.id, center, booking_date(), "08:00", "confirmed",
            ),
            { "id": "not-a-uuid" },
            MockSupabaseResponses::appointment_response(
                Uuid::new_v4(), user.id, center, booking_date(), "10:30", "pending",
            ),
        ])))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(supabase_for(&mock_server));
    let appointments = service
        .list_patient_appointments(user.id, &user.access_token)
        .await
        .unwrap();

    assert_eq!(appointments.len(), 2);
    assert_eq!(appointments[0].time, slot("08:00"));
    assert_eq!(appointments[1].time, slot("10:30"));
}

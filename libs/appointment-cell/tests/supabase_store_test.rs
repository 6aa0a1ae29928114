use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentError, AppointmentRules, PaymentMark};
use appointment_cell::services::{
    AppointmentLifecycleService, AppointmentStore, PatientStore, SupabaseAppointmentStore,
    SupabasePatientStore,
};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn client_for(mock_server: &MockServer) -> Arc<SupabaseClient> {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    Arc::new(SupabaseClient::new(&config).unwrap())
}

#[tokio::test]
async fn find_appointment_parses_snapshots() {
    let mock_server = MockServer::start().await;
    let (id, patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &id.to_string(),
                &patient_id.to_string(),
                &doctor_id.to_string(),
                (false, false, false)
            )
        ])))
        .mount(&mock_server)
        .await;

    let store = SupabaseAppointmentStore::new(client_for(&mock_server));
    let appointment = store.find_appointment(id).await.unwrap().unwrap();

    assert_eq!(appointment.doctor_id, doctor_id);
    assert_eq!(appointment.amount, 500.0);
    assert_eq!(appointment.doctor_snapshot.name, "Dr. Test");
    assert_eq!(appointment.patient_snapshot.email, "patient@example.com");
}

#[tokio::test]
async fn mark_paid_sends_guarded_patch() {
    let mock_server = MockServer::start().await;
    let (id, patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let row = |paid: bool| {
        MockSupabaseResponses::appointment_row(
            &id.to_string(),
            &patient_id.to_string(),
            &doctor_id.to_string(),
            (false, paid, false),
        )
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(false)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("cancelled", "eq.false"))
        .and(query_param("paid", "eq.false"))
        .and(body_json(json!({ "paid": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(true)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(SupabaseAppointmentStore::new(client_for(&mock_server)));
    let lifecycle = AppointmentLifecycleService::new(store, AppointmentRules::default());

    let mark = lifecycle.mark_paid(id).await.unwrap();
    assert!(matches!(mark, PaymentMark::Marked(ref a) if a.paid));
}

#[tokio::test]
async fn lost_guard_rereads_and_resolves() {
    let mock_server = MockServer::start().await;
    let (id, patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let row = |cancelled: bool| {
        MockSupabaseResponses::appointment_row(
            &id.to_string(),
            &patient_id.to_string(),
            &doctor_id.to_string(),
            (cancelled, false, false),
        )
    };

    // First read sees an open appointment, the re-read sees it cancelled.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(false)])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(true)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(SupabaseAppointmentStore::new(client_for(&mock_server)));
    let lifecycle = AppointmentLifecycleService::new(store, AppointmentRules::default());

    assert_eq!(
        lifecycle.mark_paid(id).await,
        Err(AppointmentError::AppointmentCancelled)
    );
}

#[tokio::test]
async fn patient_lookup() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&patient_id.to_string())
        ])))
        .mount(&mock_server)
        .await;

    let store = SupabasePatientStore::new(client_for(&mock_server));
    let patient = store.find_patient(patient_id).await.unwrap().unwrap();
    assert_eq!(patient.name, "Test Patient");
}

#[tokio::test]
async fn storage_errors_are_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let store = Arc::new(SupabaseAppointmentStore::new(client_for(&mock_server)));
    let lifecycle = AppointmentLifecycleService::new(store, AppointmentRules::default());

    let err = lifecycle.mark_paid(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppointmentError::DatabaseError(_)));
    assert!(err.is_retryable());
}

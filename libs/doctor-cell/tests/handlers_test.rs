use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use doctor_cell::models::{Address, Doctor, SlotMap};
use doctor_cell::router::{doctor_routes, DoctorCellState};
use doctor_cell::services::InMemoryDoctorStore;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn doctor(id: Uuid, name: &str) -> Doctor {
    Doctor {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", id),
        image: String::new(),
        speciality: "Dermatologist".to_string(),
        degree: "MBBS".to_string(),
        experience: "2 Years".to_string(),
        about: String::new(),
        fee: 300.0,
        address: Address::default(),
        available: true,
        slots_booked: SlotMap::default(),
        revision: 0,
    }
}

async fn create_test_app(doctors: Vec<Doctor>) -> (Router, String) {
    let config = TestConfig::default().to_arc();
    let store = Arc::new(InMemoryDoctorStore::new());
    for doc in doctors {
        store.insert(doc).await;
    }

    let secret = config.supabase_jwt_secret.clone();
    (doctor_routes(DoctorCellState::new(config, store)), secret)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_list_doctors_is_public() {
    let (app, _) = create_test_app(vec![
        doctor(Uuid::new_v4(), "Dr. Zoe"),
        doctor(Uuid::new_v4(), "Dr. Adam"),
    ])
    .await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["doctors"][0]["name"], "Dr. Adam");
    assert_eq!(body["doctors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_unknown_doctor_returns_404() {
    let (app, _) = create_test_app(vec![]).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Doctor not found");
}

#[tokio::test]
async fn test_doctor_toggles_own_availability() {
    let doctor_id = Uuid::new_v4();
    let (app, secret) = create_test_app(vec![doctor(doctor_id, "Dr. Own")]).await;
    let user = TestUser::with_id(doctor_id, "own@example.com", "doctor");

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}/availability", doctor_id))
                .header("authorization", JwtTestUtils::bearer(&user, &secret))
                .header("content-type", "application/json")
                .body(Body::from(json!({}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["available"], false);
}

#[tokio::test]
async fn test_doctor_cannot_change_another_doctor() {
    let target = Uuid::new_v4();
    let (app, secret) = create_test_app(vec![doctor(target, "Dr. Other")]).await;
    let user = TestUser::doctor("intruder@example.com");

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}/availability", target))
                .header("authorization", JwtTestUtils::bearer(&user, &secret))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "available": false }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_availability_requires_token() {
    let target = Uuid::new_v4();
    let (app, _) = create_test_app(vec![doctor(target, "Dr. Other")]).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}/availability", target))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "available": false }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

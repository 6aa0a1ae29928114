use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, AppointmentCellState};
use doctor_cell::router::{doctor_routes, DoctorCellState};
use payment_cell::router::{payment_routes, PaymentCellState};
use payment_cell::services::ProviderRegistry;
use shared_config::AppConfig;

use crate::stores::Stores;

pub fn create_router(config: Arc<AppConfig>, stores: Stores) -> Result<Router> {
    let providers = Arc::new(ProviderRegistry::from_config(&config)?);

    let doctors = DoctorCellState::new(config.clone(), stores.doctors.clone());
    let appointments = AppointmentCellState::new(
        config.clone(),
        stores.doctors.clone(),
        stores.patients.clone(),
        stores.appointments.clone(),
    );
    let payments = PaymentCellState::new(config, stores.appointments, providers);

    Ok(Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/doctors", doctor_routes(doctors))
        .nest("/appointments", appointment_routes(appointments))
        .nest("/payments", payment_routes(payments)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use shared_utils::test_utils::TestConfig;

    fn app() -> Router {
        create_router(TestConfig::default().to_arc(), Stores::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn liveness() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Clinic booking API is running!");
    }

    #[tokio::test]
    async fn cells_are_mounted() {
        let response = app()
            .oneshot(Request::builder().uri("/doctors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(Request::builder().uri("/appointments").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/payments/webhooks/stripe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

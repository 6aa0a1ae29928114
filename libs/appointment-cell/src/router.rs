// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use doctor_cell::services::DoctorStore;
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::models::AppointmentRules;
use crate::services::{
    AppointmentBookingService, AppointmentCancellationService, AppointmentLifecycleService,
    AppointmentStore, DoctorDashboardService, PatientStore,
};

#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<dyn DoctorStore>,
    pub patients: Arc<dyn PatientStore>,
    pub appointments: Arc<dyn AppointmentStore>,
}

impl AppointmentCellState {
    pub fn new(
        config: Arc<AppConfig>,
        doctors: Arc<dyn DoctorStore>,
        patients: Arc<dyn PatientStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            config,
            doctors,
            patients,
            appointments,
        }
    }

    pub fn rules(&self) -> AppointmentRules {
        AppointmentRules::from_config(&self.config)
    }

    pub fn booking_service(&self) -> AppointmentBookingService {
        AppointmentBookingService::new(
            Arc::clone(&self.doctors),
            Arc::clone(&self.patients),
            Arc::clone(&self.appointments),
        )
    }

    pub fn lifecycle_service(&self) -> AppointmentLifecycleService {
        AppointmentLifecycleService::new(Arc::clone(&self.appointments), self.rules())
    }

    pub fn cancellation_service(&self) -> AppointmentCancellationService {
        AppointmentCancellationService::new(Arc::clone(&self.doctors), self.lifecycle_service())
    }

    pub fn dashboard_service(&self) -> DoctorDashboardService {
        DoctorDashboardService::new(Arc::clone(&self.appointments))
    }
}

pub fn appointment_routes(state: AppointmentCellState) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::list_my_appointments))
        .route("/doctor", get(handlers::list_doctor_appointments))
        .route("/dashboard", get(handlers::doctor_dashboard))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

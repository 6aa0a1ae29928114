use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{DoctorDirectoryService, DoctorStore};

#[derive(Clone)]
pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<dyn DoctorStore>,
}

impl DoctorCellState {
    pub fn new(config: Arc<AppConfig>, doctors: Arc<dyn DoctorStore>) -> Self {
        Self { config, doctors }
    }

    pub fn directory_service(&self) -> DoctorDirectoryService {
        DoctorDirectoryService::new(Arc::clone(&self.doctors))
    }
}

pub fn doctor_routes(state: DoctorCellState) -> Router {
    // Public directory browsing
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor));

    let protected_routes = Router::new()
        .route("/{doctor_id}/availability", patch(handlers::change_availability))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

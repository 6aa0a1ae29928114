// libs/payment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::post,
    middleware,
};

use appointment_cell::models::AppointmentRules;
use appointment_cell::services::{AppointmentLifecycleService, AppointmentStore};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::models::ReconciliationPolicy;
use crate::services::{PaymentReconciliationService, ProviderRegistry};

#[derive(Clone)]
pub struct PaymentCellState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub providers: Arc<ProviderRegistry>,
}

impl PaymentCellState {
    pub fn new(
        config: Arc<AppConfig>,
        appointments: Arc<dyn AppointmentStore>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            config,
            appointments,
            providers,
        }
    }

    pub fn reconciliation_service(&self) -> PaymentReconciliationService {
        let lifecycle = AppointmentLifecycleService::new(
            Arc::clone(&self.appointments),
            AppointmentRules::from_config(&self.config),
        );

        PaymentReconciliationService::new(
            lifecycle,
            Arc::clone(&self.providers),
            ReconciliationPolicy::from_config(&self.config),
            self.config.currency.clone(),
        )
    }
}

pub fn payment_routes(state: PaymentCellState) -> Router {
    // Stripe authenticates itself with the webhook signature
    let public_routes = Router::new()
        .route("/webhooks/stripe", post(handlers::stripe_webhook));

    let protected_routes = Router::new()
        .route("/{provider}/order", post(handlers::create_order))
        .route("/{provider}/verify", post(handlers::verify_payment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

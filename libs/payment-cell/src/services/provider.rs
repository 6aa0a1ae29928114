use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use shared_config::AppConfig;

use crate::models::{OrderHandle, OrderRequest, PaymentConfirmation, PaymentError, ProviderKind};
use crate::services::razorpay::RazorpayProvider;
use crate::services::stripe::{StripeProvider, StripeWebhookVerifier};

/// A checkout provider: opens orders and turns the client's post-checkout
/// payload into a confirmation.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderHandle, PaymentError>;

    async fn verify(&self, payload: &Value) -> Result<PaymentConfirmation, PaymentError>;
}

/// Fee in major units to the provider's minor unit.
pub fn minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Every provider call shares this timeout.
pub fn http_client(config: &AppConfig) -> Result<Client, PaymentError> {
    Client::builder()
        .timeout(config.payment_timeout())
        .build()
        .map_err(|e| PaymentError::ProviderError(format!("Failed to build HTTP client: {}", e)))
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn PaymentProvider>>,
    stripe_webhook: Option<StripeWebhookVerifier>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers whichever providers have credentials configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, PaymentError> {
        let client = http_client(config)?;
        let mut registry = Self::new();

        if config.is_razorpay_configured() {
            registry.register(Arc::new(RazorpayProvider::new(config, client.clone())));
            info!("Razorpay payments enabled");
        } else {
            warn!("Razorpay credentials missing, provider disabled");
        }

        if config.is_stripe_configured() {
            registry.register(Arc::new(StripeProvider::new(config, client)));
            info!("Stripe payments enabled");
        } else {
            warn!("Stripe credentials missing, provider disabled");
        }

        if config.is_stripe_webhook_configured() {
            registry.stripe_webhook = Some(StripeWebhookVerifier::new(&config.stripe_webhook_secret));
        }

        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn with_stripe_webhook(mut self, verifier: StripeWebhookVerifier) -> Self {
        self.stripe_webhook = Some(verifier);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn PaymentProvider>, PaymentError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(PaymentError::NotConfigured(kind))
    }

    pub fn stripe_webhook(&self) -> Result<&StripeWebhookVerifier, PaymentError> {
        self.stripe_webhook
            .as_ref()
            .ok_or(PaymentError::NotConfigured(ProviderKind::Stripe))
    }
}

// libs/payment-cell/src/services/stripe.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Confidence, OrderHandle, OrderRequest, PaymentConfirmation, PaymentError, ProviderKind,
    StripeCheckoutSession, StripeEvent, StripeRedirectPayload,
};
use crate::services::provider::PaymentProvider;
use crate::services::signature;

const WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Stripe Checkout client.
/// Based on: https://docs.stripe.com/api/checkout/sessions/create
pub struct StripeProvider {
    client: Client,
    secret_key: String,
    base_url: String,
    frontend_url: String,
}

impl StripeProvider {
    pub fn new(config: &AppConfig, client: Client) -> Self {
        Self {
            client,
            secret_key: config.stripe_secret_key.clone(),
            base_url: config.stripe_base_url.trim_end_matches('/').to_string(),
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn return_url(&self, origin: &str, appointment_id: Uuid, success: bool) -> String {
        let origin = match origin.trim().trim_end_matches('/') {
            "" => self.frontend_url.as_str(),
            o => o,
        };
        format!(
            "{}/verify?success={}&appointmentId={}",
            origin,
            success,
            urlencoding::encode(&appointment_id.to_string())
        )
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Stripe
    }

    /// POST /v1/checkout/sessions (form encoded)
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderHandle, PaymentError> {
        info!("Creating Stripe checkout session for appointment {}", request.appointment_id);

        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let appointment_id = request.appointment_id.to_string();
        let currency = request.currency.to_ascii_lowercase();

        let form: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("success_url", self.return_url(&request.return_origin, request.appointment_id, true)),
            ("cancel_url", self.return_url(&request.return_origin, request.appointment_id, false)),
            ("client_reference_id", appointment_id.clone()),
            ("metadata[appointment_id]", appointment_id),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", currency.clone()),
            ("line_items[0][price_data][unit_amount]", request.amount_minor.to_string()),
            ("line_items[0][price_data][product_data][name]", "Appointment Fees".to_string()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Stripe session creation failed: {} - {}", status, response_text);
            return Err(PaymentError::ProviderError(format!("HTTP {}: {}", status, response_text)));
        }

        let session: StripeCheckoutSession = serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::ProviderError(format!("Failed to parse session response: {}", e)))?;

        info!("Created Stripe checkout session {}", session.id);
        Ok(OrderHandle {
            provider: ProviderKind::Stripe,
            order_id: session.id,
            amount: session.amount_total.unwrap_or(request.amount_minor),
            currency: session.currency.unwrap_or(currency),
            checkout_url: session.url,
            key_id: None,
        })
    }

    /// The redirect carries no signature; the confirmation is marked as
    /// redirect-trusted and the reconciliation policy decides.
    async fn verify(&self, payload: &Value) -> Result<PaymentConfirmation, PaymentError> {
        let payload: StripeRedirectPayload = serde_json::from_value(payload.clone())
            .map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;

        let appointment_id = Uuid::parse_str(payload.appointment_id.trim())
            .map_err(|_| PaymentError::InvalidPayload("appointmentId is not a valid id".to_string()))?;

        if !payload.succeeded() {
            debug!("Stripe redirect for {} reports an unfinished checkout", appointment_id);
            return Err(PaymentError::PaymentNotCompleted);
        }

        warn!("Accepting unsigned Stripe redirect for appointment {}", appointment_id);
        Ok(PaymentConfirmation {
            appointment_id,
            confidence: Confidence::RedirectTrusted,
            reference: "stripe-redirect".to_string(),
        })
    }
}

/// Verifies `Stripe-Signature` headers on webhook deliveries.
/// Based on: https://docs.stripe.com/webhooks#verify-manually
#[derive(Debug, Clone)]
pub struct StripeWebhookVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl StripeWebhookVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            tolerance_secs: WEBHOOK_TOLERANCE_SECS,
        }
    }

    /// Header format: `t=<unix>,v1=<hex>[,v1=<hex>...]`. Signed payload is
    /// `"{t}.{body}"`.
    pub fn verify(&self, header: &str, body: &[u8], now: i64) -> Result<StripeEvent, PaymentError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(PaymentError::SignatureMismatch)?;
        let issued_at: i64 = timestamp.parse().map_err(|_| PaymentError::SignatureMismatch)?;

        if now.abs_diff(issued_at) > self.tolerance_secs {
            warn!("Stripe webhook timestamp {} outside tolerance", issued_at);
            return Err(PaymentError::SignatureMismatch);
        }

        let parts: [&[u8]; 3] = [timestamp.as_bytes(), &b"."[..], body];
        let valid = signatures
            .iter()
            .any(|sig| signature::verify_hex(self.secret.as_bytes(), &parts, sig));

        if !valid {
            warn!("Stripe webhook signature mismatch");
            return Err(PaymentError::SignatureMismatch);
        }

        serde_json::from_slice(body).map_err(|e| PaymentError::InvalidPayload(e.to_string()))
    }

    /// Builds a header for `body`; the counterpart of `verify`.
    pub fn sign(&self, body: &[u8], timestamp: i64) -> Option<String> {
        let t = timestamp.to_string();
        signature::sign_hex(self.secret.as_bytes(), &[t.as_bytes(), &b"."[..], body])
            .map(|sig| format!("t={},v1={}", t, sig))
    }
}

/// Only a paid `checkout.session.completed` confirms anything.
pub fn confirmation_from_event(event: &StripeEvent) -> Option<PaymentConfirmation> {
    if event.event_type != "checkout.session.completed" {
        return None;
    }

    let session: StripeCheckoutSession = serde_json::from_value(event.data.object.clone()).ok()?;
    if session.payment_status.as_deref() != Some("paid") {
        return None;
    }

    let reference = session
        .client_reference_id
        .as_deref()
        .or_else(|| session.metadata.get("appointment_id").map(String::as_str))?;

    Some(PaymentConfirmation {
        appointment_id: Uuid::parse_str(reference).ok()?,
        confidence: Confidence::SignatureVerified,
        reference: session.id,
    })
}

// libs/payment-cell/src/services/razorpay.rs
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Confidence, OrderHandle, OrderRequest, PaymentConfirmation, PaymentError, ProviderKind,
    RazorpayOrder, RazorpayVerifyPayload,
};
use crate::services::provider::PaymentProvider;
use crate::services::signature;

/// Razorpay Orders API client.
/// Based on: https://razorpay.com/docs/api/orders/
pub struct RazorpayProvider {
    client: Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayProvider {
    pub fn new(config: &AppConfig, client: Client) -> Self {
        Self {
            client,
            key_id: config.razorpay_key_id.clone(),
            key_secret: config.razorpay_key_secret.clone(),
            base_url: config.razorpay_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Signature the checkout widget returns: hex HMAC-SHA256 over
    /// `"{order_id}|{payment_id}"` keyed with the account secret.
    pub fn expected_signature(&self, order_id: &str, payment_id: &str) -> Option<String> {
        let message = format!("{}|{}", order_id, payment_id);
        signature::sign_hex(self.key_secret.as_bytes(), &[message.as_bytes()])
    }

    /// GET /v1/orders/{id}
    pub async fn fetch_order(&self, order_id: &str) -> Result<RazorpayOrder, PaymentError> {
        let url = format!("{}/v1/orders/{}", self.base_url, order_id);
        debug!("Fetching Razorpay order: {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            warn!("Razorpay order {} not found ({})", order_id, status);
            return Err(PaymentError::OrderNotFound);
        }

        let response_text = response.text().await?;
        if !status.is_success() {
            error!("Razorpay order fetch failed: {} - {}", status, response_text);
            return Err(PaymentError::ProviderError(format!("HTTP {}: {}", status, response_text)));
        }

        serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::ProviderError(format!("Failed to parse order response: {}", e)))
    }
}

#[async_trait]
impl PaymentProvider for RazorpayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Razorpay
    }

    /// POST /v1/orders
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderHandle, PaymentError> {
        info!("Creating Razorpay order for appointment {}", request.appointment_id);

        let url = format!("{}/v1/orders", self.base_url);
        let body = json!({
            "amount": request.amount_minor,
            "currency": request.currency,
            "receipt": request.appointment_id.to_string(),
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Razorpay order creation failed: {} - {}", status, response_text);
            return Err(PaymentError::ProviderError(format!("HTTP {}: {}", status, response_text)));
        }

        let order: RazorpayOrder = serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::ProviderError(format!("Failed to parse order response: {}", e)))?;

        info!("Created Razorpay order {}", order.id);
        Ok(OrderHandle {
            provider: ProviderKind::Razorpay,
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            checkout_url: None,
            key_id: Some(self.key_id.clone()),
        })
    }

    /// The signature is checked before any network call, so forged payloads
    /// never reach Razorpay.
    async fn verify(&self, payload: &Value) -> Result<PaymentConfirmation, PaymentError> {
        let payload: RazorpayVerifyPayload = serde_json::from_value(payload.clone())
            .map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;

        let message = format!("{}|{}", payload.razorpay_order_id, payload.razorpay_payment_id);
        if !signature::verify_hex(
            self.key_secret.as_bytes(),
            &[message.as_bytes()],
            &payload.razorpay_signature,
        ) {
            warn!("Razorpay signature mismatch for order {}", payload.razorpay_order_id);
            return Err(PaymentError::SignatureMismatch);
        }

        let order = self.fetch_order(&payload.razorpay_order_id).await?;

        if order.status != "paid" {
            warn!("Razorpay order {} is {}, not paid", order.id, order.status);
            return Err(PaymentError::PaymentNotCompleted);
        }

        let appointment_id = order
            .receipt
            .as_deref()
            .and_then(|receipt| Uuid::parse_str(receipt).ok())
            .ok_or(PaymentError::OrderNotFound)?;

        Ok(PaymentConfirmation {
            appointment_id,
            confidence: Confidence::SignatureVerified,
            reference: payload.razorpay_payment_id,
        })
    }
}

// libs/payment-cell/src/models.rs
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use appointment_cell::models::AppointmentError;
use shared_config::AppConfig;
use shared_models::error::AppError;

// ==============================================================================
// PROVIDER MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Razorpay,
    Stripe,
}

impl FromStr for ProviderKind {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "razorpay" => Ok(ProviderKind::Razorpay),
            "stripe" => Ok(ProviderKind::Stripe),
            other => Err(PaymentError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Razorpay => write!(f, "razorpay"),
            ProviderKind::Stripe => write!(f, "stripe"),
        }
    }
}

/// How much a confirmation can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Backed by a provider signature we checked.
    SignatureVerified,
    /// Only the client's word that the checkout redirect said "success".
    RedirectTrusted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub appointment_id: Uuid,
    /// Amount in the currency's minor unit (paise, cents).
    pub amount_minor: i64,
    pub currency: String,
    /// Origin the checkout should send the browser back to.
    pub return_origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub provider: ProviderKind,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    /// Public key the browser widget needs (Razorpay).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub appointment_id: Uuid,
    pub confidence: Confidence,
    pub reference: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(alias = "appointment_id")]
    pub appointment_id: Option<String>,
}

impl CreateOrderRequest {
    pub fn appointment_id(&self) -> Result<Uuid, PaymentError> {
        let raw = self
            .appointment_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PaymentError::InvalidPayload("appointmentId is required".to_string()))?;

        Uuid::parse_str(raw).map_err(|_| PaymentError::InvalidPayload("appointmentId is not a valid id".to_string()))
    }
}

/// Body the Razorpay checkout widget hands back to the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayVerifyPayload {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeRedirectPayload {
    #[serde(alias = "appointment_id")]
    pub appointment_id: String,
    /// The redirect query carries this as a string, API clients as a bool.
    pub success: Value,
}

impl StripeRedirectPayload {
    pub fn succeeded(&self) -> bool {
        match &self.success {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("Unknown payment provider: {0}")]
    UnknownProvider(String),

    #[error("Payment provider {0} is not configured")]
    NotConfigured(ProviderKind),

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Unauthorized action")]
    Forbidden,

    #[error("Appointment Cancelled or not found")]
    AppointmentCancelled,

    #[error("Appointment is already paid")]
    AlreadyPaid,

    #[error("Payment signature mismatch")]
    SignatureMismatch,

    #[error("Payment order not found")]
    OrderNotFound,

    #[error("Payment was not completed")]
    PaymentNotCompleted,

    #[error("Payment confirmation could not be verified")]
    UnverifiedConfirmation,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Payment provider error: {0}")]
    ProviderError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::ProviderUnavailable(_) | PaymentError::DatabaseError(_))
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            PaymentError::ProviderUnavailable(err.to_string())
        } else if err.is_decode() {
            PaymentError::ProviderError(format!("Unreadable provider response: {}", err))
        } else {
            PaymentError::ProviderError(err.to_string())
        }
    }
}

impl From<AppointmentError> for PaymentError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => PaymentError::AppointmentNotFound,
            AppointmentError::AppointmentCancelled => PaymentError::AppointmentCancelled,
            AppointmentError::Forbidden => PaymentError::Forbidden,
            AppointmentError::DatabaseError(msg) => PaymentError::DatabaseError(msg),
            AppointmentError::Contention => PaymentError::DatabaseError(err.to_string()),
            other => PaymentError::InvalidPayload(other.to_string()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::UnknownProvider(_)
            | PaymentError::AppointmentNotFound
            | PaymentError::OrderNotFound => AppError::NotFound(err.to_string()),
            PaymentError::Forbidden => AppError::Forbidden(err.to_string()),
            PaymentError::NotConfigured(_)
            | PaymentError::AppointmentCancelled
            | PaymentError::AlreadyPaid
            | PaymentError::SignatureMismatch
            | PaymentError::PaymentNotCompleted
            | PaymentError::UnverifiedConfirmation => AppError::BadRequest(err.to_string()),
            PaymentError::InvalidPayload(msg) => AppError::BadRequest(msg),
            PaymentError::ProviderUnavailable(msg) => AppError::Unavailable(msg),
            PaymentError::ProviderError(msg) => AppError::ExternalService(msg),
            PaymentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// POLICY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationPolicy {
    /// Accept unsigned "checkout succeeded" redirects from the booking patient.
    pub accept_redirect_confirmations: bool,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            accept_redirect_confirmations: true,
        }
    }
}

impl ReconciliationPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            accept_redirect_confirmations: config.accept_redirect_confirmations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn provider_kind_parsing() {
        assert_eq!("Razorpay".parse::<ProviderKind>(), Ok(ProviderKind::Razorpay));
        assert_eq!(" stripe ".parse::<ProviderKind>(), Ok(ProviderKind::Stripe));
        assert_eq!(
            "paypal".parse::<ProviderKind>(),
            Err(PaymentError::UnknownProvider("paypal".to_string()))
        );
    }

    #[test]
    fn redirect_success_flag() {
        let payload: StripeRedirectPayload =
            serde_json::from_value(serde_json::json!({ "appointmentId": "x", "success": "true" })).unwrap();
        assert!(payload.succeeded());

        let payload: StripeRedirectPayload =
            serde_json::from_value(serde_json::json!({ "appointmentId": "x", "success": false })).unwrap();
        assert!(!payload.succeeded());
    }

    #[test]
    fn error_status_mapping() {
        let status = |e: PaymentError| AppError::from(e).status_code();
        assert_eq!(status(PaymentError::SignatureMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(status(PaymentError::OrderNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(PaymentError::ProviderUnavailable("t".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(PaymentError::ProviderError("x".into())), StatusCode::BAD_GATEWAY);
        assert!(PaymentError::ProviderUnavailable("t".into()).is_retryable());
        assert!(!PaymentError::SignatureMismatch.is_retryable());
    }

    #[test]
    fn create_order_request_needs_valid_id() {
        assert!(CreateOrderRequest::default().appointment_id().is_err());
        let id = Uuid::new_v4();
        let request = CreateOrderRequest {
            appointment_id: Some(id.to_string()),
        };
        assert_eq!(request.appointment_id(), Ok(id));
    }
}

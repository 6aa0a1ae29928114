// libs/payment-cell/src/handlers.rs
use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::{header::ORIGIN, HeaderMap},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use appointment_cell::models::PaymentMark;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateOrderRequest, PaymentError, ProviderKind};
use crate::router::PaymentCellState;

const STRIPE_SIGNATURE: &str = "stripe-signature";

#[axum::debug_handler]
pub async fn create_order(
    State(state): State<PaymentCellState>,
    Path(provider): Path<String>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;
    let kind: ProviderKind = provider.parse()?;
    let appointment_id = request.appointment_id()?;

    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let order = state
        .reconciliation_service()
        .create_order(&principal, kind, appointment_id, origin)
        .await?;

    Ok(Json(json!({
        "success": true,
        "order": order
    })))
}

#[axum::debug_handler]
pub async fn verify_payment(
    State(state): State<PaymentCellState>,
    Path(provider): Path<String>,
    Extension(user): Extension<User>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;
    let kind: ProviderKind = provider.parse()?;

    let mark = state
        .reconciliation_service()
        .verify(&principal, kind, &payload)
        .await?;

    let message = match mark {
        PaymentMark::Marked(_) => "Payment Successful",
        PaymentMark::AlreadyPaid(_) => "Payment already recorded",
    };

    Ok(Json(json!({
        "success": true,
        "message": message
    })))
}

#[axum::debug_handler]
pub async fn stripe_webhook(
    State(state): State<PaymentCellState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .ok_or(PaymentError::SignatureMismatch)?;

    state
        .reconciliation_service()
        .handle_stripe_webhook(signature, &body, Utc::now().timestamp())
        .await?;

    Ok(Json(json!({
        "success": true,
        "received": true
    })))
}

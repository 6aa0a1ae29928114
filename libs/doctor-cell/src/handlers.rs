use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::ChangeAvailabilityRequest;
use crate::router::DoctorCellState;

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<DoctorCellState>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.directory_service().list_doctors().await?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<DoctorCellState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state.directory_service().get_doctor(doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn change_availability(
    State(state): State<DoctorCellState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<ChangeAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;

    let doctor = state
        .directory_service()
        .change_availability(&principal, doctor_id, request.available)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability status updated",
        "available": doctor.available
    })))
}

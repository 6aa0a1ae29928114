// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, CancelOutcome};
use crate::router::AppointmentCellState;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;
    if principal.role != Role::Patient {
        return Err(AppError::Forbidden("Only patients can book appointments".to_string()));
    }

    let (doctor_id, slot) = request.validate()?;

    let appointment = state
        .booking_service()
        .book_slot(principal.id, doctor_id, &slot)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Booked",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;
    if principal.role != Role::Patient {
        return Err(AppError::Forbidden("Patient access required".to_string()));
    }

    let appointments = state
        .booking_service()
        .appointments_for_patient(principal.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;
    if principal.role != Role::Doctor {
        return Err(AppError::Forbidden("Doctor access required".to_string()));
    }

    let appointments = state
        .booking_service()
        .appointments_for_doctor(principal.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn doctor_dashboard(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;
    if principal.role != Role::Doctor {
        return Err(AppError::Forbidden("Doctor access required".to_string()));
    }

    let dashboard = state.dashboard_service().doctor_dashboard(principal.id).await?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentCellState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;

    let appointment = state
        .booking_service()
        .get_appointment(&principal, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentCellState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;

    let outcome = state
        .cancellation_service()
        .cancel_appointment(&principal, appointment_id)
        .await?;

    let message = match outcome {
        CancelOutcome::Cancelled { .. } => "Appointment Cancelled",
        CancelOutcome::AlreadyCancelled(_) => "Appointment already cancelled",
    };

    Ok(Json(json!({
        "success": true,
        "message": message
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppointmentCellState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = user.principal()?;

    state
        .lifecycle_service()
        .complete_appointment(&principal, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Completed"
    })))
}

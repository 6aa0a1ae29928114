// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::{Address, Doctor, SlotError, SlotKey};
use shared_config::AppConfig;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Doctor display fields frozen at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSnapshot {
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub speciality: String,
    #[serde(default)]
    pub experience: String,
    pub fee: f64,
    #[serde(default)]
    pub address: Address,
}

impl From<&Doctor> for DoctorSnapshot {
    fn from(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            image: doctor.image.clone(),
            speciality: doctor.speciality.clone(),
            experience: doctor.experience.clone(),
            fee: doctor.fee,
            address: doctor.address.clone(),
        }
    }
}

/// Patient display fields frozen at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub image: String,
}

impl From<&Patient> for PatientSnapshot {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            email: patient.email.clone(),
            image: patient.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
    /// Doctor fee at booking time; never recomputed.
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub cancelled: bool,
    pub paid: bool,
    pub completed: bool,
    pub doctor_snapshot: DoctorSnapshot,
    pub patient_snapshot: PatientSnapshot,
}

impl Appointment {
    pub fn new(patient: &Patient, doctor: &Doctor, slot: &SlotKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id: doctor.id,
            slot_date: slot.date().to_string(),
            slot_time: slot.time().to_string(),
            amount: doctor.fee,
            created_at: Utc::now(),
            cancelled: false,
            paid: false,
            completed: false,
            doctor_snapshot: DoctorSnapshot::from(doctor),
            patient_snapshot: PatientSnapshot::from(patient),
        }
    }

    pub fn slot(&self) -> Result<SlotKey, SlotError> {
        SlotKey::parse(&self.slot_date, &self.slot_time)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Every field is optional so missing values produce a 400 with a readable
/// message instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    #[serde(alias = "doctor_id", alias = "docId")]
    pub doctor_id: Option<String>,
    #[serde(alias = "slotDate", alias = "slot_date")]
    pub date: Option<String>,
    #[serde(alias = "slotTime", alias = "slot_time")]
    pub time: Option<String>,
}

impl BookAppointmentRequest {
    pub fn validate(&self) -> Result<(Uuid, SlotKey), AppointmentError> {
        let (doctor_id, date, time) = match (&self.doctor_id, &self.date, &self.time) {
            (Some(d), Some(date), Some(time))
                if !d.trim().is_empty() && !date.trim().is_empty() && !time.trim().is_empty() =>
            {
                (d, date, time)
            }
            _ => {
                return Err(AppointmentError::ValidationError(
                    "Missing details: doctorId, date, time are required".to_string(),
                ))
            }
        };

        let doctor_id = Uuid::parse_str(doctor_id.trim())
            .map_err(|_| AppointmentError::ValidationError("doctorId is not a valid id".to_string()))?;
        let slot = SlotKey::parse(date, time)?;

        Ok((doctor_id, slot))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled { appointment: Appointment, slot_released: bool },
    AlreadyCancelled(Appointment),
}

impl CancelOutcome {
    pub fn appointment(&self) -> &Appointment {
        match self {
            CancelOutcome::Cancelled { appointment, .. } => appointment,
            CancelOutcome::AlreadyCancelled(appointment) => appointment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentMark {
    Marked(Appointment),
    AlreadyPaid(Appointment),
}

impl PaymentMark {
    pub fn appointment(&self) -> &Appointment {
        match self {
            PaymentMark::Marked(appointment) | PaymentMark::AlreadyPaid(appointment) => appointment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Cancel,
    Complete,
    MarkPaid,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Cancel => "cancel",
            Transition::Complete => "complete",
            Transition::MarkPaid => "mark paid",
        }
    }
}

/// Result of checking a transition against the current flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    Proceed,
    /// The target state already holds; the caller treats this as success.
    AlreadyApplied,
}

// ==============================================================================
// STATISTICS AND SUMMARY MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorDashboard {
    pub earnings: f64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor not available")]
    DoctorUnavailable,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Slot not available")]
    SlotUnavailable,

    #[error("Unauthorized action")]
    Forbidden,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Appointment is cancelled")]
    AppointmentCancelled,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot map is busy, retry the request")]
    Contention,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppointmentError::Contention | AppointmentError::DatabaseError(_))
    }
}

impl From<SlotError> for AppointmentError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::DoctorNotFound => AppointmentError::DoctorNotFound,
            SlotError::DoctorUnavailable => AppointmentError::DoctorUnavailable,
            SlotError::SlotUnavailable => AppointmentError::SlotUnavailable,
            SlotError::InvalidSlot(msg) => AppointmentError::ValidationError(msg),
            SlotError::Contention => AppointmentError::Contention,
            SlotError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            AppointmentError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
            AppointmentError::DoctorUnavailable => AppError::BadRequest("Doctor not available".to_string()),
            AppointmentError::SlotUnavailable => AppError::BadRequest("Slot not available".to_string()),
            AppointmentError::AppointmentCancelled => AppError::BadRequest(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
            AppointmentError::Forbidden => AppError::Forbidden(err.to_string()),
            AppointmentError::InvalidTransition(msg) => AppError::Conflict(msg),
            AppointmentError::Contention => AppError::Unavailable(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// RULES
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentRules {
    /// When set, `complete` refuses unpaid appointments.
    pub require_payment_before_completion: bool,
}

impl AppointmentRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            require_payment_before_completion: config.require_payment_before_completion,
        }
    }
}

// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::{Principal, Role};

use crate::models::{
    Appointment, AppointmentError, AppointmentRules, PaymentMark, Transition, TransitionCheck,
};
use crate::services::store::{AppointmentStore, FlagGuard, FlagPatch};

const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Pure check of `transition` against the appointment's current flags.
pub fn validate_transition(
    appointment: &Appointment,
    transition: Transition,
    rules: &AppointmentRules,
) -> Result<TransitionCheck, AppointmentError> {
    match transition {
        Transition::Cancel => {
            if appointment.cancelled {
                Ok(TransitionCheck::AlreadyApplied)
            } else if appointment.completed {
                Err(AppointmentError::InvalidTransition(
                    "Completed appointments cannot be cancelled".to_string(),
                ))
            } else {
                Ok(TransitionCheck::Proceed)
            }
        }
        Transition::Complete => {
            if appointment.cancelled {
                Err(AppointmentError::InvalidTransition(
                    "Cancelled appointments cannot be completed".to_string(),
                ))
            } else if appointment.completed {
                Ok(TransitionCheck::AlreadyApplied)
            } else if rules.require_payment_before_completion && !appointment.paid {
                Err(AppointmentError::InvalidTransition(
                    "Appointment must be paid before completion".to_string(),
                ))
            } else {
                Ok(TransitionCheck::Proceed)
            }
        }
        Transition::MarkPaid => {
            if appointment.cancelled {
                Err(AppointmentError::AppointmentCancelled)
            } else if appointment.paid {
                Ok(TransitionCheck::AlreadyApplied)
            } else {
                Ok(TransitionCheck::Proceed)
            }
        }
    }
}

/// The booking patient, the appointment's doctor, or an admin.
pub fn authorize_participant(principal: &Principal, appointment: &Appointment) -> Result<(), AppointmentError> {
    let allowed = match principal.role {
        Role::Admin => true,
        Role::Doctor => principal.id == appointment.doctor_id,
        Role::Patient => principal.id == appointment.patient_id,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden)
    }
}

fn guard_and_patch(transition: Transition, rules: &AppointmentRules) -> (FlagGuard, FlagPatch) {
    match transition {
        Transition::Cancel => (
            FlagGuard {
                cancelled: Some(false),
                completed: Some(false),
                paid: None,
            },
            FlagPatch {
                cancelled: Some(true),
                ..Default::default()
            },
        ),
        Transition::Complete => (
            FlagGuard {
                cancelled: Some(false),
                completed: Some(false),
                paid: rules.require_payment_before_completion.then_some(true),
            },
            FlagPatch {
                completed: Some(true),
                ..Default::default()
            },
        ),
        Transition::MarkPaid => (
            FlagGuard {
                cancelled: Some(false),
                paid: Some(false),
                completed: None,
            },
            FlagPatch {
                paid: Some(true),
                ..Default::default()
            },
        ),
    }
}

pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    rules: AppointmentRules,
}

impl AppointmentLifecycleService {
    pub fn new(appointments: Arc<dyn AppointmentStore>, rules: AppointmentRules) -> Self {
        Self { appointments, rules }
    }

    pub fn rules(&self) -> &AppointmentRules {
        &self.rules
    }

    pub async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .find_appointment(appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)
    }

    /// Apply `transition` with a guarded write. When the guard fails another
    /// writer moved the flags first; re-read and re-validate. Returns the
    /// stored appointment and whether this call performed the write.
    pub async fn apply(
        &self,
        current: Appointment,
        transition: Transition,
    ) -> Result<(Appointment, bool), AppointmentError> {
        let (guard, patch) = guard_and_patch(transition, &self.rules);
        let mut current = current;

        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            if validate_transition(&current, transition, &self.rules)? == TransitionCheck::AlreadyApplied {
                debug!("{} already applied to appointment {}", transition.as_str(), current.id);
                return Ok((current, false));
            }

            let updated = self
                .appointments
                .update_flags(current.id, guard, patch)
                .await
                .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

            match updated {
                Some(appointment) => return Ok((appointment, true)),
                None => {
                    debug!(
                        "Guard failed for {} on appointment {} (attempt {})",
                        transition.as_str(),
                        current.id,
                        attempt
                    );
                    current = self.load(current.id).await?;
                }
            }
        }

        warn!("Gave up applying {} to appointment {}", transition.as_str(), current.id);
        Err(AppointmentError::Contention)
    }

    /// Mark the appointment as seen. Only its doctor or an admin may do this.
    pub async fn complete_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;

        if principal.role == Role::Patient {
            return Err(AppointmentError::Forbidden);
        }
        authorize_participant(principal, &appointment)?;

        let (appointment, written) = self.apply(appointment, Transition::Complete).await?;
        if written {
            info!("Appointment {} completed by {}", appointment_id, principal.id);
        }

        Ok(appointment)
    }

    /// Idempotent; a cancelled appointment can never become paid.
    pub async fn mark_paid(&self, appointment_id: Uuid) -> Result<PaymentMark, AppointmentError> {
        let appointment = self.load(appointment_id).await?;

        let (appointment, written) = self.apply(appointment, Transition::MarkPaid).await?;
        if written {
            info!("Appointment {} marked as paid", appointment_id);
            Ok(PaymentMark::Marked(appointment))
        } else {
            Ok(PaymentMark::AlreadyPaid(appointment))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use doctor_cell::models::Address;

    use crate::models::{DoctorSnapshot, PatientSnapshot};

    fn appointment(cancelled: bool, paid: bool, completed: bool) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            slot_date: "2024-06-01".to_string(),
            slot_time: "10:00".to_string(),
            amount: 500.0,
            created_at: Utc::now(),
            cancelled,
            paid,
            completed,
            doctor_snapshot: DoctorSnapshot {
                name: "Dr. Test".to_string(),
                image: String::new(),
                speciality: "General physician".to_string(),
                experience: "4 Years".to_string(),
                fee: 500.0,
                address: Address::default(),
            },
            patient_snapshot: PatientSnapshot {
                name: "Test Patient".to_string(),
                email: "patient@example.com".to_string(),
                image: String::new(),
            },
        }
    }

    #[test]
    fn cancel_rules() {
        let rules = AppointmentRules::default();
        assert_eq!(
            validate_transition(&appointment(false, false, false), Transition::Cancel, &rules),
            Ok(TransitionCheck::Proceed)
        );
        assert_eq!(
            validate_transition(&appointment(true, false, false), Transition::Cancel, &rules),
            Ok(TransitionCheck::AlreadyApplied)
        );
        assert!(matches!(
            validate_transition(&appointment(false, false, true), Transition::Cancel, &rules),
            Err(AppointmentError::InvalidTransition(_))
        ));
    }

    #[test]
    fn complete_rules_honour_payment_policy() {
        let relaxed = AppointmentRules::default();
        let strict = AppointmentRules {
            require_payment_before_completion: true,
        };
        let unpaid = appointment(false, false, false);

        assert_eq!(
            validate_transition(&unpaid, Transition::Complete, &relaxed),
            Ok(TransitionCheck::Proceed)
        );
        assert!(matches!(
            validate_transition(&unpaid, Transition::Complete, &strict),
            Err(AppointmentError::InvalidTransition(_))
        ));
        assert_eq!(
            validate_transition(&appointment(false, true, false), Transition::Complete, &strict),
            Ok(TransitionCheck::Proceed)
        );
        assert!(matches!(
            validate_transition(&appointment(true, true, false), Transition::Complete, &relaxed),
            Err(AppointmentError::InvalidTransition(_))
        ));
    }

    #[test]
    fn paying_a_cancelled_appointment_is_rejected() {
        let rules = AppointmentRules::default();
        assert_eq!(
            validate_transition(&appointment(true, false, false), Transition::MarkPaid, &rules),
            Err(AppointmentError::AppointmentCancelled)
        );
        assert_eq!(
            validate_transition(&appointment(false, true, true), Transition::MarkPaid, &rules),
            Ok(TransitionCheck::AlreadyApplied)
        );
    }

    #[test]
    fn participants() {
        let appt = appointment(false, false, false);

        assert!(authorize_participant(&Principal::patient(appt.patient_id), &appt).is_ok());
        assert!(authorize_participant(&Principal::doctor(appt.doctor_id), &appt).is_ok());
        assert!(authorize_participant(&Principal::admin(Uuid::new_v4()), &appt).is_ok());
        assert_eq!(
            authorize_participant(&Principal::patient(Uuid::new_v4()), &appt),
            Err(AppointmentError::Forbidden)
        );
        assert_eq!(
            authorize_participant(&Principal::doctor(Uuid::new_v4()), &appt),
            Err(AppointmentError::Forbidden)
        );
    }
}

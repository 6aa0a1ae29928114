use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use doctor_cell::services::{DoctorStore, SlotAllocator};
use shared_models::auth::Principal;

use crate::models::{Appointment, AppointmentError, CancelOutcome, Transition};
use crate::services::lifecycle::{authorize_participant, AppointmentLifecycleService};

pub struct AppointmentCancellationService {
    lifecycle: AppointmentLifecycleService,
    allocator: SlotAllocator,
}

impl AppointmentCancellationService {
    pub fn new(doctors: Arc<dyn DoctorStore>, lifecycle: AppointmentLifecycleService) -> Self {
        Self {
            lifecycle,
            allocator: SlotAllocator::new(doctors),
        }
    }

    /// Cancel and give the slot back. Cancelling twice is a no-op the second
    /// time; a completed appointment cannot be cancelled.
    pub async fn cancel_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> Result<CancelOutcome, AppointmentError> {
        let appointment = self.lifecycle.load(appointment_id).await?;
        authorize_participant(principal, &appointment)?;

        let (appointment, written) = self.lifecycle.apply(appointment, Transition::Cancel).await?;
        if !written {
            return Ok(CancelOutcome::AlreadyCancelled(appointment));
        }

        info!("Appointment {} cancelled by {} ({})", appointment_id, principal.id, principal.role);

        let slot_released = self.release_slot(&appointment).await;
        Ok(CancelOutcome::Cancelled {
            appointment,
            slot_released,
        })
    }

    /// The cancellation stands even if the release fails.
    async fn release_slot(&self, appointment: &Appointment) -> bool {
        let slot = match appointment.slot() {
            Ok(slot) => slot,
            Err(e) => {
                warn!("Appointment {} has an unreadable slot: {}", appointment.id, e);
                return false;
            }
        };

        match self.allocator.release(appointment.doctor_id, &slot).await {
            Ok(released) => released,
            Err(e) => {
                warn!(
                    "Failed to release {} {} for doctor {} after cancelling {}: {}",
                    slot.date(),
                    slot.time(),
                    appointment.doctor_id,
                    appointment.id,
                    e
                );
                false
            }
        }
    }
}

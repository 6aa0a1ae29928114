use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Doctor, SlotError, SlotKey};
use crate::services::store::DoctorStore;

const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Owns every write to `Doctor::slots_booked`.
pub struct SlotAllocator {
    store: Arc<dyn DoctorStore>,
    max_attempts: usize,
}

impl SlotAllocator {
    pub fn new(store: Arc<dyn DoctorStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(store: Arc<dyn DoctorStore>, max_attempts: usize) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn load(&self, doctor_id: Uuid) -> Result<Doctor, SlotError> {
        self.store
            .find_doctor(doctor_id)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?
            .ok_or(SlotError::DoctorNotFound)
    }

    /// Reserve `slot` for the doctor. A lost compare-and-swap re-reads the
    /// doctor and re-checks, so two racing reservations of the same slot end
    /// with exactly one winner and one `SlotUnavailable`.
    pub async fn reserve(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<Doctor, SlotError> {
        for attempt in 1..=self.max_attempts {
            let doctor = self.load(doctor_id).await?;

            if !doctor.available {
                return Err(SlotError::DoctorUnavailable);
            }

            let mut slots = doctor.slots_booked.clone();
            if !slots.insert(slot) {
                debug!("Slot {} {} already taken for doctor {}", slot.date(), slot.time(), doctor_id);
                return Err(SlotError::SlotUnavailable);
            }

            let swapped = self
                .store
                .compare_and_swap_slots(doctor_id, doctor.revision, &slots)
                .await
                .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

            match swapped {
                Some(updated) => {
                    info!("Reserved {} {} for doctor {}", slot.date(), slot.time(), doctor_id);
                    return Ok(updated);
                }
                None => {
                    debug!(
                        "Revision {} of doctor {} moved during reservation (attempt {})",
                        doctor.revision, doctor_id, attempt
                    );
                }
            }
        }

        warn!("Gave up reserving a slot for doctor {} after {} attempts", doctor_id, self.max_attempts);
        Err(SlotError::Contention)
    }

    /// Release `slot`. Releasing a slot that is not held is a no-op and
    /// performs no write; returns whether anything was removed.
    pub async fn release(&self, doctor_id: Uuid, slot: &SlotKey) -> Result<bool, SlotError> {
        for attempt in 1..=self.max_attempts {
            let doctor = self.load(doctor_id).await?;

            let mut slots = doctor.slots_booked.clone();
            if !slots.remove(slot) {
                debug!("Slot {} {} not held by doctor {}, nothing to release", slot.date(), slot.time(), doctor_id);
                return Ok(false);
            }

            let swapped = self
                .store
                .compare_and_swap_slots(doctor_id, doctor.revision, &slots)
                .await
                .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

            if swapped.is_some() {
                info!("Released {} {} for doctor {}", slot.date(), slot.time(), doctor_id);
                return Ok(true);
            }

            debug!("Revision moved while releasing for doctor {} (attempt {})", doctor_id, attempt);
        }

        warn!("Gave up releasing a slot for doctor {} after {} attempts", doctor_id, self.max_attempts);
        Err(SlotError::Contention)
    }
}

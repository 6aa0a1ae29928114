use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Doctor, SlotMap};
use crate::services::store::DoctorStore;

/// Process-local doctor store. Writes hold the lock across the revision check,
/// so compare-and-swap is atomic within the process.
#[derive(Default)]
pub struct InMemoryDoctorStore {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
}

impl InMemoryDoctorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    pub async fn get(&self, doctor_id: Uuid) -> Option<Doctor> {
        self.doctors.read().await.get(&doctor_id).cloned()
    }
}

#[async_trait]
impl DoctorStore for InMemoryDoctorStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.get(doctor_id).await)
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = self.doctors.read().await.values().cloned().collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn compare_and_swap_slots(
        &self,
        doctor_id: Uuid,
        expected_revision: i64,
        slots: &SlotMap,
    ) -> Result<Option<Doctor>> {
        let mut doctors = self.doctors.write().await;

        match doctors.get_mut(&doctor_id) {
            Some(doctor) if doctor.revision == expected_revision => {
                doctor.slots_booked = slots.clone();
                doctor.revision += 1;
                Ok(Some(doctor.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_available(&self, doctor_id: Uuid, available: bool) -> Result<Option<Doctor>> {
        let mut doctors = self.doctors.write().await;

        Ok(doctors.get_mut(&doctor_id).map(|doctor| {
            doctor.available = available;
            doctor.clone()
        }))
    }
}

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::{Principal, Role};

use crate::models::{Doctor, DoctorError};
use crate::services::store::DoctorStore;

pub struct DoctorDirectoryService {
    store: Arc<dyn DoctorStore>,
}

impl DoctorDirectoryService {
    pub fn new(store: Arc<dyn DoctorStore>) -> Self {
        Self { store }
    }

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors");

        self.store
            .list_doctors()
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.store
            .find_doctor(doctor_id)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?
            .ok_or(DoctorError::NotFound)
    }

    /// Set or toggle the doctor's availability flag. Doctors may only touch
    /// their own record.
    pub async fn change_availability(
        &self,
        principal: &Principal,
        doctor_id: Uuid,
        available: Option<bool>,
    ) -> Result<Doctor, DoctorError> {
        let allowed = match principal.role {
            Role::Admin => true,
            Role::Doctor => principal.id == doctor_id,
            Role::Patient => false,
        };
        if !allowed {
            return Err(DoctorError::Forbidden);
        }

        let current = self.get_doctor(doctor_id).await?;
        let target = available.unwrap_or(!current.available);

        let updated = self
            .store
            .set_available(doctor_id, target)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?
            .ok_or(DoctorError::NotFound)?;

        info!("Doctor {} availability set to {}", doctor_id, updated.available);
        Ok(updated)
    }
}

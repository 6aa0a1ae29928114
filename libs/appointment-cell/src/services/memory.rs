use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Appointment, Patient};
use crate::services::store::{AppointmentStore, FlagGuard, FlagPatch, PatientStore};

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, appointment_id: Uuid) -> Option<Appointment> {
        self.appointments.read().await.get(&appointment_id).cloned()
    }

    pub async fn all(&self) -> Vec<Appointment> {
        self.appointments.read().await.values().cloned().collect()
    }

    async fn filtered(&self, keep: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| keep(a))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        appointments
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.get(appointment_id).await)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            bail!("Appointment {} already exists", appointment.id);
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn update_flags(
        &self,
        appointment_id: Uuid,
        guard: FlagGuard,
        patch: FlagPatch,
    ) -> Result<Option<Appointment>> {
        let mut appointments = self.appointments.write().await;

        match appointments.get_mut(&appointment_id) {
            Some(appointment) if guard.matches(appointment) => {
                patch.apply(appointment);
                Ok(Some(appointment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
        Ok(self.filtered(|a| a.patient_id == patient_id).await)
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        Ok(self.filtered(|a| a.doctor_id == doctor_id).await)
    }
}

#[derive(Default)]
pub struct InMemoryPatientStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, patient: Patient) {
        self.patients.write().await.insert(patient.id, patient);
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>> {
        Ok(self.patients.read().await.get(&patient_id).cloned())
    }
}

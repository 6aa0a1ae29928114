// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::models::{Doctor, SlotKey};
use doctor_cell::services::{DoctorStore, SlotAllocator};
use shared_models::auth::Principal;

use crate::models::{Appointment, AppointmentError, Patient};
use crate::services::lifecycle::authorize_participant;
use crate::services::store::{AppointmentStore, PatientStore};

pub struct AppointmentBookingService {
    doctors: Arc<dyn DoctorStore>,
    patients: Arc<dyn PatientStore>,
    appointments: Arc<dyn AppointmentStore>,
    allocator: SlotAllocator,
}

impl AppointmentBookingService {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        patients: Arc<dyn PatientStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        let allocator = SlotAllocator::new(Arc::clone(&doctors));
        Self {
            doctors,
            patients,
            appointments,
            allocator,
        }
    }

    async fn load_doctor(&self, doctor_id: Uuid) -> Result<Doctor, AppointmentError> {
        self.doctors
            .find_doctor(doctor_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::DoctorNotFound)
    }

    async fn load_patient(&self, patient_id: Uuid) -> Result<Patient, AppointmentError> {
        self.patients
            .find_patient(patient_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::PatientNotFound)
    }

    /// Book from raw date/time strings.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: &str,
        time: &str,
    ) -> Result<Appointment, AppointmentError> {
        let slot = SlotKey::parse(date, time)?;
        self.book_slot(patient_id, doctor_id, &slot).await
    }

    /// Reserve the slot, then persist the appointment. If persisting fails the
    /// reservation is released again and the persistence error is returned.
    pub async fn book_slot(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        slot: &SlotKey,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking {} {} with doctor {} for patient {}",
            slot.date(),
            slot.time(),
            doctor_id,
            patient_id
        );

        let doctor = self.load_doctor(doctor_id).await?;
        if !doctor.available {
            return Err(AppointmentError::DoctorUnavailable);
        }

        let patient = self.load_patient(patient_id).await?;

        // The allocator re-reads the doctor, so the snapshot below comes from
        // the same revision that took the slot.
        let doctor = self.allocator.reserve(doctor_id, slot).await?;

        let appointment = Appointment::new(&patient, &doctor, slot);

        match self.appointments.insert_appointment(&appointment).await {
            Ok(stored) => {
                info!(
                    "Appointment {} booked: doctor {} at {} {}",
                    stored.id,
                    doctor_id,
                    slot.date(),
                    slot.time()
                );
                Ok(stored)
            }
            Err(e) => {
                error!("Failed to persist appointment for doctor {}: {}", doctor_id, e);

                if let Err(release_err) = self.allocator.release(doctor_id, slot).await {
                    warn!(
                        "Could not release {} {} for doctor {} after failed booking: {}",
                        slot.date(),
                        slot.time(),
                        doctor_id,
                        release_err
                    );
                }

                Err(AppointmentError::DatabaseError(e.to_string()))
            }
        }
    }

    pub async fn get_appointment(
        &self,
        principal: &Principal,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .appointments
            .find_appointment(appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)?;

        authorize_participant(principal, &appointment)?;
        Ok(appointment)
    }

    /// Newest first.
    pub async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self
            .appointments
            .list_for_patient(patient_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    /// Newest first.
    pub async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self
            .appointments
            .list_for_doctor(doctor_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }
}

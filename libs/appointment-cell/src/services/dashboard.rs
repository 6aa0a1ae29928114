use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, DoctorDashboard};
use crate::services::store::AppointmentStore;

const LATEST_APPOINTMENTS: usize = 5;

/// Earnings only count appointments that were seen and paid.
pub fn summarize(appointments: &[Appointment]) -> DoctorDashboard {
    let earnings = appointments
        .iter()
        .filter(|a| a.completed && !a.cancelled && a.paid)
        .map(|a| a.amount)
        .sum();

    let patients = appointments
        .iter()
        .map(|a| a.patient_id)
        .collect::<HashSet<_>>()
        .len();

    let mut latest: Vec<Appointment> = appointments.to_vec();
    latest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    latest.truncate(LATEST_APPOINTMENTS);

    DoctorDashboard {
        earnings,
        appointments: appointments.len(),
        patients,
        latest_appointments: latest,
    }
}

pub struct DoctorDashboardService {
    appointments: Arc<dyn AppointmentStore>,
}

impl DoctorDashboardService {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }

    pub async fn doctor_dashboard(&self, doctor_id: Uuid) -> Result<DoctorDashboard, AppointmentError> {
        debug!("Building dashboard for doctor {}", doctor_id);

        let appointments = self
            .appointments
            .list_for_doctor(doctor_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(summarize(&appointments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use doctor_cell::models::Address;

    use crate::models::{DoctorSnapshot, PatientSnapshot};

    fn appointment(patient_id: Uuid, amount: f64, flags: (bool, bool, bool), age_minutes: i64) -> Appointment {
        let (cancelled, paid, completed) = flags;
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: Uuid::nil(),
            slot_date: "2024-06-01".to_string(),
            slot_time: "10:00".to_string(),
            amount,
            created_at: Utc::now() - Duration::minutes(age_minutes),
            cancelled,
            paid,
            completed,
            doctor_snapshot: DoctorSnapshot {
                name: "Dr. Test".to_string(),
                image: String::new(),
                speciality: "General physician".to_string(),
                experience: String::new(),
                fee: amount,
                address: Address::default(),
            },
            patient_snapshot: PatientSnapshot {
                name: "P".to_string(),
                email: "p@example.com".to_string(),
                image: String::new(),
            },
        }
    }

    #[test]
    fn earnings_need_completed_and_paid() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let appointments = vec![
            appointment(p1, 500.0, (false, true, true), 10),
            appointment(p1, 300.0, (false, false, true), 9),
            appointment(p2, 700.0, (false, true, false), 8),
            appointment(p2, 900.0, (true, true, true), 7),
        ];

        let dashboard = summarize(&appointments);

        assert_eq!(dashboard.earnings, 500.0);
        assert_eq!(dashboard.appointments, 4);
        assert_eq!(dashboard.patients, 2);
    }

    #[test]
    fn latest_are_newest_first_and_capped() {
        let patient = Uuid::new_v4();
        let appointments: Vec<Appointment> = (0..8)
            .map(|age| appointment(patient, 100.0, (false, false, false), age))
            .collect();

        let dashboard = summarize(&appointments);

        assert_eq!(dashboard.latest_appointments.len(), 5);
        assert_eq!(dashboard.latest_appointments[0].id, appointments[0].id);
        assert_eq!(dashboard.earnings, 0.0);
    }

    #[test]
    fn empty_dashboard() {
        let dashboard = summarize(&[]);
        assert_eq!(dashboard.appointments, 0);
        assert_eq!(dashboard.patients, 0);
        assert!(dashboard.latest_appointments.is_empty());
    }
}

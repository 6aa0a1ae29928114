use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use appointment_cell::services::{
    AppointmentStore, InMemoryAppointmentStore, InMemoryPatientStore, PatientStore,
    SupabaseAppointmentStore, SupabasePatientStore,
};
use doctor_cell::services::{DoctorStore, InMemoryDoctorStore, SupabaseDoctorStore};
use shared_config::{AppConfig, StoreBackend};
use shared_database::SupabaseClient;

/// Store handles shared by every cell.
#[derive(Clone)]
pub struct Stores {
    pub doctors: Arc<dyn DoctorStore>,
    pub patients: Arc<dyn PatientStore>,
    pub appointments: Arc<dyn AppointmentStore>,
}

impl Stores {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match config.store_backend {
            StoreBackend::Supabase => {
                let supabase = Arc::new(SupabaseClient::new(config)?);
                info!("Using Supabase store at {}", supabase.get_base_url());

                Ok(Self {
                    doctors: Arc::new(SupabaseDoctorStore::new(supabase.clone())),
                    patients: Arc::new(SupabasePatientStore::new(supabase.clone())),
                    appointments: Arc::new(SupabaseAppointmentStore::new(supabase)),
                })
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            doctors: Arc::new(InMemoryDoctorStore::new()),
            patients: Arc::new(InMemoryPatientStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
        }
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, Patient};

/// Preconditions for a flag update. `None` means "don't care".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagGuard {
    pub cancelled: Option<bool>,
    pub completed: Option<bool>,
    pub paid: Option<bool>,
}

impl FlagGuard {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.cancelled.map_or(true, |v| appointment.cancelled == v)
            && self.completed.map_or(true, |v| appointment.completed == v)
            && self.paid.map_or(true, |v| appointment.paid == v)
    }

    fn to_filters(self) -> String {
        let mut filters = String::new();
        for (column, value) in [
            ("cancelled", self.cancelled),
            ("completed", self.completed),
            ("paid", self.paid),
        ] {
            if let Some(value) = value {
                filters.push_str(&format!("&{}=eq.{}", column, value));
            }
        }
        filters
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlagPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
}

impl FlagPatch {
    pub fn apply(&self, appointment: &mut Appointment) {
        if let Some(v) = self.cancelled {
            appointment.cancelled = v;
        }
        if let Some(v) = self.completed {
            appointment.completed = v;
        }
        if let Some(v) = self.paid {
            appointment.paid = v;
        }
    }
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment>;

    /// Applies `patch` only when the stored row satisfies `guard`. `None` means
    /// the guard failed or the row is gone.
    async fn update_flags(
        &self,
        appointment_id: Uuid,
        guard: FlagGuard,
        patch: FlagPatch,
    ) -> Result<Option<Appointment>>;

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>>;

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>>;
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>>;
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).context("Failed to parse appointment row"))
            .collect()
    }

    async fn list(&self, path: &str) -> Result<Vec<Appointment>> {
        let rows: Vec<Value> = self.supabase.request(Method::GET, path, None).await?;
        Self::parse_rows(rows)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=*", appointment_id);
        Ok(self.list(&path).await?.into_iter().next())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment> {
        let body = serde_json::to_value(appointment)?;

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .context("Insert returned no appointment row")
    }

    async fn update_flags(
        &self,
        appointment_id: Uuid,
        guard: FlagGuard,
        patch: FlagPatch,
    ) -> Result<Option<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}{}",
            appointment_id,
            guard.to_filters()
        );
        debug!("Conditional flag update: {}", path);

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(serde_json::to_value(patch)?),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        self.list(&path).await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=created_at.desc",
            doctor_id
        );
        self.list(&path).await
    }
}

pub struct SupabasePatientStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePatientStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl PatientStore for SupabasePatientStore {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id,name,email,image", patient_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).context("Failed to parse patient row"))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_filters_only_include_set_flags() {
        let guard = FlagGuard {
            cancelled: Some(false),
            completed: None,
            paid: Some(true),
        };
        assert_eq!(guard.to_filters(), "&cancelled=eq.false&paid=eq.true");
        assert_eq!(FlagGuard::default().to_filters(), "");
    }

    #[test]
    fn patch_serializes_without_unset_flags() {
        let patch = FlagPatch {
            paid: Some(true),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(patch).unwrap(), serde_json::json!({ "paid": true }));
    }
}

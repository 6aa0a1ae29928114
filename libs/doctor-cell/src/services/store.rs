use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, SlotMap};

/// Persistence seam for doctor documents.
#[async_trait]
pub trait DoctorStore: Send + Sync {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>>;

    async fn list_doctors(&self) -> Result<Vec<Doctor>>;

    /// Writes `slots` only if the stored revision still equals
    /// `expected_revision`, bumping it by one. `None` means the revision moved
    /// (or the doctor vanished) and nothing was written.
    async fn compare_and_swap_slots(
        &self,
        doctor_id: Uuid,
        expected_revision: i64,
        slots: &SlotMap,
    ) -> Result<Option<Doctor>>;

    async fn set_available(&self, doctor_id: Uuid, available: bool) -> Result<Option<Doctor>>;
}

pub struct SupabaseDoctorStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Doctor>> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).context("Failed to parse doctor row"))
            .collect()
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Option<Doctor>> {
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                path,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }
}

#[async_trait]
impl DoctorStore for SupabaseDoctorStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=*", doctor_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/doctors?select=*&order=name.asc", None)
            .await?;

        Self::parse_rows(rows)
    }

    async fn compare_and_swap_slots(
        &self,
        doctor_id: Uuid,
        expected_revision: i64,
        slots: &SlotMap,
    ) -> Result<Option<Doctor>> {
        debug!("CAS slots for doctor {} at revision {}", doctor_id, expected_revision);

        // The revision filter turns the PATCH into a conditional update: zero
        // rows back means another writer got there first.
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&revision=eq.{}",
            doctor_id, expected_revision
        );
        let body = json!({
            "slots_booked": slots,
            "revision": expected_revision + 1,
        });

        self.patch(&path, body).await
    }

    async fn set_available(&self, doctor_id: Uuid, available: bool) -> Result<Option<Doctor>> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.patch(&path, json!({ "available": available })).await
    }
}

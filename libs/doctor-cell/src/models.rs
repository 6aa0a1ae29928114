use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// DOCTOR RECORD
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub image: String,
    pub speciality: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub about: String,
    pub fee: f64,
    #[serde(default)]
    pub address: Address,
    pub available: bool,
    #[serde(default)]
    pub slots_booked: SlotMap,
    /// Bumped on every slot-map write; writers compare-and-swap on it.
    #[serde(default)]
    pub revision: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeAvailabilityRequest {
    /// Absent means toggle.
    pub available: Option<bool>,
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// A validated (date, time) pair in canonical form: `YYYY-MM-DD` and 24h `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    date: String,
    time: String,
}

impl SlotKey {
    pub fn parse(date: &str, time: &str) -> Result<Self, SlotError> {
        let date = date.trim();
        let time = time.trim();

        if date.contains('_') {
            return Err(SlotError::InvalidSlot(format!(
                "Date '{}' must use the YYYY-MM-DD format",
                date
            )));
        }

        let parsed_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| SlotError::InvalidSlot(format!("Invalid slot date '{}'", date)))?;

        let parsed_time = NaiveTime::parse_from_str(time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&time.to_ascii_uppercase(), "%I:%M %p"))
            .map_err(|_| SlotError::InvalidSlot(format!("Invalid slot time '{}'", time)))?;

        Ok(Self {
            date: parsed_date.format("%Y-%m-%d").to_string(),
            time: parsed_time.format("%H:%M").to_string(),
        })
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }
}

/// Per-day set of reserved times. Empty days are kept after a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotMap(BTreeMap<String, BTreeSet<String>>);

impl SlotMap {
    pub fn is_reserved(&self, slot: &SlotKey) -> bool {
        self.0
            .get(slot.date())
            .map(|times| times.contains(slot.time()))
            .unwrap_or(false)
    }

    /// Returns false when the time was already taken.
    pub fn insert(&mut self, slot: &SlotKey) -> bool {
        self.0
            .entry(slot.date().to_string())
            .or_default()
            .insert(slot.time().to_string())
    }

    /// Returns false when there was nothing to remove.
    pub fn remove(&mut self, slot: &SlotKey) -> bool {
        self.0
            .get_mut(slot.date())
            .map(|times| times.remove(slot.time()))
            .unwrap_or(false)
    }

    pub fn times_on(&self, date: &str) -> Vec<&str> {
        self.0
            .get(date)
            .map(|times| times.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains_date(&self, date: &str) -> bool {
        self.0.contains_key(date)
    }

    pub fn reserved_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SlotError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor not available")]
    DoctorUnavailable,

    #[error("Slot not available")]
    SlotUnavailable,

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Slot map is busy, retry the request")]
    Contention,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl SlotError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SlotError::Contention | SlotError::DatabaseError(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Not allowed to modify this doctor")]
    Forbidden,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            SlotError::DoctorUnavailable => AppError::BadRequest("Doctor not available".to_string()),
            SlotError::SlotUnavailable => AppError::BadRequest("Slot not available".to_string()),
            SlotError::InvalidSlot(msg) => AppError::BadRequest(msg),
            SlotError::Contention => AppError::Unavailable(err.to_string()),
            SlotError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::Forbidden => AppError::Forbidden(err.to_string()),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_normalizes_input() {
        let key = SlotKey::parse("2024-6-1", "9:30").unwrap();
        assert_eq!(key.date(), "2024-06-01");
        assert_eq!(key.time(), "09:30");

        let key = SlotKey::parse(" 2024-06-01 ", "02:15 pm").unwrap();
        assert_eq!(key.time(), "14:15");
    }

    #[test]
    fn slot_key_rejects_underscore_dates() {
        assert!(matches!(
            SlotKey::parse("1_6_2024", "10:00"),
            Err(SlotError::InvalidSlot(_))
        ));
        assert!(SlotKey::parse("2024-02-30", "10:00").is_err());
        assert!(SlotKey::parse("2024-02-03", "25:00").is_err());
    }

    #[test]
    fn slot_map_keeps_times_unique() {
        let key = SlotKey::parse("2024-06-01", "10:00").unwrap();
        let mut map = SlotMap::default();

        assert!(map.insert(&key));
        assert!(!map.insert(&key));
        assert_eq!(map.times_on("2024-06-01"), vec!["10:00"]);

        assert!(map.remove(&key));
        assert!(!map.remove(&key));
        assert!(map.contains_date("2024-06-01"));
        assert_eq!(map.reserved_count(), 0);
    }

    #[test]
    fn slot_map_serializes_as_plain_object() {
        let key = SlotKey::parse("2024-06-01", "10:00").unwrap();
        let mut map = SlotMap::default();
        map.insert(&key);

        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value, serde_json::json!({ "2024-06-01": ["10:00"] }));
    }
}

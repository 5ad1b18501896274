use std::collections::BTreeSet;
use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key of the persisted rotation cursor.
pub const CURSOR_KEY: &str = "currentDoctorIndex";

// ==============================================================================
// WEEKDAYS
// ==============================================================================

const WEEKDAY_NAMES: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Numeric weekday, 1 = Monday through 7 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WeekdayCode(u8);

impl WeekdayCode {
    /// Every code in iteration order, Monday first.
    pub fn all() -> impl Iterator<Item = WeekdayCode> {
        (1..=7).map(WeekdayCode)
    }

    /// Decodes a full English weekday name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let needle = name.trim();
        WEEKDAY_NAMES
            .iter()
            .find(|(full, _)| full.eq_ignore_ascii_case(needle))
            .map(|(_, weekday)| Self::from(*weekday))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn weekday(self) -> Weekday {
        WEEKDAY_NAMES[(self.0 - 1) as usize].1
    }
}

impl From<Weekday> for WeekdayCode {
    fn from(weekday: Weekday) -> Self {
        WeekdayCode(weekday.number_from_monday() as u8)
    }
}

impl fmt::Display for WeekdayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.weekday())
    }
}

// ==============================================================================
// DOCTOR DIRECTORY RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoctorStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "not available")]
    NotAvailable,
}

/// A doctor as returned by the directory query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: Uuid,
    #[serde(default)]
    pub doctor_schedule: Option<Vec<String>>,
    pub status: DoctorStatus,
}

impl DoctorRecord {
    pub fn active(id: Uuid, schedule: &[&str]) -> Self {
        Self {
            id,
            doctor_schedule: Some(schedule.iter().map(|d| d.to_string()).collect()),
            status: DoctorStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DoctorStatus::Active
    }
}

// ==============================================================================
// ROSTER
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub doctor_id: Uuid,
    pub available_days: BTreeSet<WeekdayCode>,
}

impl RosterEntry {
    pub fn is_available_on(&self, day: WeekdayCode) -> bool {
        self.available_days.contains(&day)
    }
}

/// Active doctors in directory order. That order is the within-day tie-break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of doctor-day slots in one week.
    pub fn total_slots(&self) -> usize {
        self.entries.iter().map(|e| e.available_days.len()).sum()
    }
}

// ==============================================================================
// SEQUENCE
// ==============================================================================

/// One fairness cycle of doctor ids. Rebuilt on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RotationSequence {
    doctors: Vec<Uuid>,
}

impl RotationSequence {
    pub fn new(doctors: Vec<Uuid>) -> Self {
        Self { doctors }
    }

    pub fn len(&self) -> usize {
        self.doctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Uuid> {
        self.doctors.get(index).copied()
    }

    pub fn as_slice(&self) -> &[Uuid] {
        &self.doctors
    }

    pub fn occurrences(&self, doctor_id: Uuid) -> usize {
        self.doctors.iter().filter(|id| **id == doctor_id).count()
    }
}

// ==============================================================================
// API RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub doctor_id: Uuid,
}

/// Current rotation state, read without advancing the cursor.
#[derive(Debug, Clone, Serialize)]
pub struct RotationPreview {
    pub sequence: RotationSequence,
    pub length: usize,
    pub cursor: u64,
    pub next_doctor_id: Uuid,
}

/// A row of the `rotations` key/value table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationRow {
    pub key: String,
    pub value: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_names_decode_case_insensitively() {
        assert_eq!(WeekdayCode::from_name("Monday").map(WeekdayCode::value), Some(1));
        assert_eq!(WeekdayCode::from_name("SUNDAY").map(WeekdayCode::value), Some(7));
        assert_eq!(WeekdayCode::from_name(" wednesday ").map(WeekdayCode::value), Some(3));
        assert_eq!(WeekdayCode::from_name("mon"), None);
        assert_eq!(WeekdayCode::from_name("funday"), None);
    }

    #[test]
    fn test_codes_match_chrono_numbering() {
        for code in WeekdayCode::all() {
            assert_eq!(code.weekday().number_from_monday() as u8, code.value());
            assert_eq!(WeekdayCode::from(code.weekday()), code);
        }
        assert_eq!(WeekdayCode::all().count(), 7);
    }

    #[test]
    fn test_doctor_status_serialization() {
        let record: DoctorRecord = serde_json::from_value(serde_json::json!({
            "id": Uuid::nil(),
            "status": "not available"
        }))
        .unwrap();

        assert_eq!(record.status, DoctorStatus::NotAvailable);
        assert!(record.doctor_schedule.is_none());
        assert!(!record.is_active());
    }
}

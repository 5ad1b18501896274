use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::RotationError;
use crate::models::{DoctorRecord, Roster, RosterEntry, WeekdayCode};

/// Read-only source of doctors eligible for rotation.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Active doctors with their weekly schedules, in a stable order.
    async fn list_active_doctors(&self) -> Result<Vec<DoctorRecord>, RotationError>;
}

pub struct SupabaseDoctorDirectory {
    supabase: SupabaseClient,
    auth_token: Option<String>,
}

impl SupabaseDoctorDirectory {
    pub fn new(config: &AppConfig, auth_token: Option<&str>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: auth_token.map(str::to_string),
        }
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn list_active_doctors(&self) -> Result<Vec<DoctorRecord>, RotationError> {
        let path = "/rest/v1/doctors?select=id,doctor_schedule,status&status=eq.active&order=created_at.asc,id.asc";

        let doctors: Vec<DoctorRecord> = self.supabase
            .request(Method::GET, path, self.auth_token.as_deref(), None)
            .await
            .map_err(|e| RotationError::Directory(e.to_string()))?;

        debug!("Doctor directory returned {} active doctors", doctors.len());
        Ok(doctors)
    }
}

/// Directory backed by a vector, for embedding and tests.
#[derive(Default)]
pub struct InMemoryDoctorDirectory {
    doctors: RwLock<Vec<DoctorRecord>>,
}

impl InMemoryDoctorDirectory {
    pub fn new(doctors: Vec<DoctorRecord>) -> Self {
        Self {
            doctors: RwLock::new(doctors),
        }
    }

    pub async fn replace(&self, doctors: Vec<DoctorRecord>) {
        *self.doctors.write().await = doctors;
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn list_active_doctors(&self) -> Result<Vec<DoctorRecord>, RotationError> {
        let doctors = self.doctors.read().await;
        Ok(doctors.iter().filter(|d| d.is_active()).cloned().collect())
    }
}

/// Loads the active roster, decoding every schedule day into a weekday code.
///
/// Any unrecognized day name fails the whole load.
pub async fn load_roster(directory: &dyn DoctorDirectory) -> Result<Roster, RotationError> {
    let doctors = directory.list_active_doctors().await?;

    let entries = doctors
        .into_iter()
        .filter(|doctor| doctor.is_active())
        .map(roster_entry)
        .collect::<Result<Vec<_>, _>>()?;

    if entries.is_empty() {
        return Err(RotationError::NoActiveDoctors);
    }

    debug!("Loaded roster of {} doctors", entries.len());
    Ok(Roster::new(entries))
}

fn roster_entry(doctor: DoctorRecord) -> Result<RosterEntry, RotationError> {
    let available_days = doctor
        .doctor_schedule
        .unwrap_or_default()
        .into_iter()
        .map(|day| {
            WeekdayCode::from_name(&day).ok_or(RotationError::InvalidSchedule {
                doctor_id: doctor.id,
                day,
            })
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(RosterEntry {
        doctor_id: doctor.id,
        available_days,
    })
}

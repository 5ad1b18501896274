use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum RotationError {
    #[error("No active doctors found")]
    NoActiveDoctors,

    #[error("Invalid day in schedule of doctor {doctor_id}: {day}")]
    InvalidSchedule { doctor_id: Uuid, day: String },

    #[error("No active doctor has an available day")]
    EmptySequence,

    #[error("Doctor directory error: {0}")]
    Directory(String),

    #[error("Cursor store error: {0}")]
    Store(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<RotationError> for AppError {
    fn from(err: RotationError) -> Self {
        match err {
            RotationError::NoActiveDoctors | RotationError::EmptySequence => {
                AppError::Conflict(format!("No doctors available: {}", err))
            }
            RotationError::InvalidSchedule { .. } => AppError::Internal(err.to_string()),
            RotationError::Directory(_) => AppError::ExternalService(err.to_string()),
            RotationError::Store(_) | RotationError::Redis(_) => AppError::Database(err.to_string()),
        }
    }
}

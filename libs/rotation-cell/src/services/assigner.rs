use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RotationError;
use crate::models::{RotationPreview, RotationSequence};
use crate::services::cursor::{wrap_index, CursorStore};
use crate::services::roster::{load_roster, DoctorDirectory};
use crate::services::sequence::build_sequence;

/// Hands out doctors in rotation order for new patients.
pub struct DoctorAssigner {
    directory: Arc<dyn DoctorDirectory>,
    cursor: Arc<dyn CursorStore>,
}

impl DoctorAssigner {
    pub fn new(directory: Arc<dyn DoctorDirectory>, cursor: Arc<dyn CursorStore>) -> Self {
        Self { directory, cursor }
    }

    /// Returns the next doctor and persists the advanced cursor.
    ///
    /// Roster and sequence errors are returned before the cursor store is
    /// touched, so a failed call never moves the rotation.
    pub async fn assign_doctor(&self) -> Result<Uuid, RotationError> {
        let sequence = self.current_sequence().await?;

        let index = self.cursor.advance_cursor(sequence.len()).await?;
        let doctor_id = sequence
            .get(index)
            .ok_or_else(|| RotationError::Store(format!(
                "cursor {} outside sequence of {} turns",
                index,
                sequence.len()
            )))?;

        info!("Assigned doctor {} (turn {} of {})", doctor_id, index + 1, sequence.len());
        Ok(doctor_id)
    }

    /// Rebuilds the sequence from the current roster.
    pub async fn current_sequence(&self) -> Result<RotationSequence, RotationError> {
        let roster = load_roster(self.directory.as_ref()).await?;
        build_sequence(&roster)
    }

    /// Reports the sequence and the doctor next in line without advancing.
    pub async fn preview(&self) -> Result<RotationPreview, RotationError> {
        let sequence = self.current_sequence().await?;
        let cursor = self.cursor.read_cursor().await?;
        let index = wrap_index(cursor, sequence.len());

        let next_doctor_id = sequence
            .get(index)
            .ok_or(RotationError::EmptySequence)?;

        Ok(RotationPreview {
            length: sequence.len(),
            sequence,
            cursor,
            next_doctor_id,
        })
    }

    /// Starts the rotation over from the first turn.
    pub async fn reset_cursor(&self) -> Result<(), RotationError> {
        debug!("Resetting rotation cursor");
        self.cursor.write_cursor(0).await
    }
}

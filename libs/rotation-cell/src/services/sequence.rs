use tracing::debug;

use crate::error::RotationError;
use crate::models::{Roster, RotationSequence, WeekdayCode};

/// Builds one week of doctor turns, Monday through Sunday.
///
/// Each day appends the doctors available that day, least used first. The
/// usage counts are taken at the start of the day and ties keep roster order,
/// so the result is deterministic for a given roster snapshot. A doctor
/// appears once per distinct available weekday.
pub fn build_sequence(roster: &Roster) -> Result<RotationSequence, RotationError> {
    let entries = roster.entries();
    let mut usage = vec![0u32; entries.len()];
    let mut doctors = Vec::with_capacity(roster.total_slots());

    for day in WeekdayCode::all() {
        let mut available: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_available_on(day))
            .map(|(position, _)| position)
            .collect();

        // sort_by_key is stable
        available.sort_by_key(|&position| usage[position]);

        for position in available {
            doctors.push(entries[position].doctor_id);
            usage[position] += 1;
        }
    }

    if doctors.is_empty() {
        return Err(RotationError::EmptySequence);
    }

    debug!("Built rotation sequence of {} turns for {} doctors", doctors.len(), entries.len());
    Ok(RotationSequence::new(doctors))
}

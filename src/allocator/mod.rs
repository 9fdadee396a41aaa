mod conflicts;
mod phases;
mod scoring;
mod types;

pub use conflicts::{overlap_conflict, same_weekend_conflict};
pub use scoring::{satisfaction_score, UNASSIGNED_PENALTY, UNRANKED_PENALTY};
pub use types::{
    AllocError, AllocationConfig, AllocationOutcome, AllocationWarning, SecondPassOrder,
};

use crate::model::{Person, Shift, ShiftId};
use crate::preferences::PreferenceStore;
use std::collections::HashMap;

/// One configured allocation run over a fixed calendar and preference store.
///
/// Construction validates the configuration; the run itself never fails.
/// Degraded conditions become warnings in the returned outcome.
#[derive(Debug)]
pub struct Allocator<'a> {
    calendar: &'a [Shift],
    by_id: HashMap<ShiftId, usize>,
    store: &'a PreferenceStore,
    cfg: AllocationConfig,
}

impl<'a> Allocator<'a> {
    pub fn new(
        calendar: &'a [Shift],
        store: &'a PreferenceStore,
        cfg: AllocationConfig,
    ) -> Result<Self, AllocError> {
        if calendar.is_empty() {
            return Err(AllocError::EmptyCalendar);
        }
        if cfg.max_shifts_per_person == 0 {
            return Err(AllocError::ZeroMaxShifts);
        }
        let mut by_id = HashMap::with_capacity(calendar.len());
        for (idx, shift) in calendar.iter().enumerate() {
            if shift.capacity == 0 {
                return Err(AllocError::ZeroCapacity(shift.id));
            }
            if by_id.insert(shift.id, idx).is_some() {
                return Err(AllocError::DuplicateShiftId(shift.id));
            }
        }
        Ok(Self { calendar, by_id, store, cfg })
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.cfg
    }

    /// Run the three assignment phases over `people`. Managers are filtered
    /// out here; everyone else ends up in the outcome map, possibly with an
    /// empty shift list.
    pub fn run(&self, people: &[Person]) -> AllocationOutcome {
        phases::run(self, people)
    }

    fn shift(&self, id: ShiftId) -> Option<&'a Shift> {
        self.by_id.get(&id).map(|&idx| &self.calendar[idx])
    }
}

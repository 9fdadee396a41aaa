use crate::model::{PersonId, ShiftId};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Processing order of the second-shift pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecondPassOrder {
    /// People whose first shift ranked best go first. Historical behavior of
    /// the system this replaces; kept as the default for run-for-run parity.
    #[default]
    BestServedFirst,
    /// People whose first shift ranked worst go first, so a bad first pick is
    /// compensated with priority on the second.
    WorstServedFirst,
}

/// Knobs for one allocation run.
#[derive(Debug, Clone, Copy)]
pub struct AllocationConfig {
    /// 1 or 2 in the shipped deployments; anything >= 1 is accepted.
    pub max_shifts_per_person: u32,
    /// Seed for the run-local RNG. Equal inputs + equal seed means an
    /// identical outcome, which is what makes reruns auditable.
    pub seed: u64,
    pub second_pass: SecondPassOrder,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            max_shifts_per_person: 2,
            seed: 42,
            second_pass: SecondPassOrder::default(),
        }
    }
}

/// Fatal problems caught before any assignment work starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AllocError {
    #[error("calendar contains no shifts")]
    EmptyCalendar,
    #[error("shift id {0} appears twice in the calendar")]
    DuplicateShiftId(ShiftId),
    #[error("shift {0} has zero capacity")]
    ZeroCapacity(ShiftId),
    #[error("max shifts per person must be at least 1")]
    ZeroMaxShifts,
}

/// Non-fatal conditions recorded while a run completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationWarning {
    /// No liked or category-fallback shift was admissible in the first pass.
    FirstShiftUnassigned(PersonId),
    /// Same, for the second pass.
    SecondShiftUnassigned(PersonId),
    /// Person had no complete preference set and went through the random
    /// fallback.
    RandomFallback(PersonId),
    /// Random fallback could not meet the person's remaining need.
    Underassigned(PersonId),
}

impl AllocationWarning {
    pub fn person(&self) -> &PersonId {
        match self {
            AllocationWarning::FirstShiftUnassigned(p)
            | AllocationWarning::SecondShiftUnassigned(p)
            | AllocationWarning::RandomFallback(p)
            | AllocationWarning::Underassigned(p) => p,
        }
    }
}

impl fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationWarning::FirstShiftUnassigned(p) => {
                write!(f, "{p} could not be assigned a first shift via preferences")
            }
            AllocationWarning::SecondShiftUnassigned(p) => {
                write!(f, "{p} could not be assigned a second shift via preferences")
            }
            AllocationWarning::RandomFallback(p) => {
                write!(f, "{p} was randomly assigned (no or incomplete preferences)")
            }
            AllocationWarning::Underassigned(p) => {
                write!(f, "{p} could not be fully assigned - insufficient available shifts")
            }
        }
    }
}

/// Final state of one run. Ordered maps so serializing the outcome twice for
/// the same inputs yields byte-identical documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationOutcome {
    /// Person -> shifts, chronological order.
    pub assignments: BTreeMap<PersonId, Vec<ShiftId>>,
    /// Shift -> people, assignment order. Never longer than the capacity.
    pub occupancy: BTreeMap<ShiftId, Vec<PersonId>>,
    pub warnings: Vec<AllocationWarning>,
    /// Shifts whose filled count ended below capacity, calendar order.
    pub unfilled: Vec<ShiftId>,
}

impl AllocationOutcome {
    /// Warnings rendered for the diagnostics consumer.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.to_string()).collect()
    }
}

#![forbid(unsafe_code)]
//! Weekendshift — preference-based weekend shift allocation (no database).
//!
//! - File-backed state (JSON/CSV) with atomic writes and rotated backups.
//! - Multi-phase allocator: seeded shuffle, liked-list scan, category
//!   fallback, random fill for missing submissions.
//! - Deterministic under a fixed seed; degraded conditions become warnings,
//!   never errors.

pub mod allocator;
pub mod calendar;
pub mod io;
pub mod model;
pub mod preferences;
pub mod report;
pub mod storage;

pub use allocator::{
    AllocError, AllocationConfig, AllocationOutcome, AllocationWarning, Allocator,
    SecondPassOrder,
};
pub use calendar::{generate, next_saturday, CalendarConfig, CalendarError, ShiftTemplate, SlotSpec};
pub use model::{
    Person, PersonId, Roster, Shift, ShiftCategory, ShiftDay, ShiftId, TimeWindow,
};
pub use preferences::{
    PreferenceIssue, PreferenceRules, PreferenceSet, PreferenceStore, PreferenceSubmission,
};
pub use report::{RankOutcome, ReportRenderer, SatisfactionReport, TextRenderer};
pub use storage::{JsonStore, SavedRun, Settings, StoreError};

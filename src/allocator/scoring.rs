use crate::model::ShiftId;
use crate::preferences::PreferenceSet;

/// Score for a shift outside the liked list (disliked included).
pub const UNRANKED_PENALTY: u32 = 999;

/// Score for a person the first pass left without any shift.
pub const UNASSIGNED_PENALTY: u32 = 9_999;

/// Rank of an assigned shift against a person's preferences: 1 for the top
/// pick, up to the liked-list length, `UNRANKED_PENALTY` otherwise. Lower is
/// strictly better.
pub fn satisfaction_score(prefs: &PreferenceSet, shift: ShiftId) -> u32 {
    match prefs.rank_of(shift) {
        Some(idx) => idx as u32 + 1,
        None => UNRANKED_PENALTY,
    }
}

use crate::model::Shift;

/// True when any held shift shares the candidate's weekend. One person never
/// works both days of the same weekend.
pub fn same_weekend_conflict(held: &[&Shift], candidate: &Shift) -> bool {
    held.iter().any(|s| s.week_index == candidate.week_index)
}

/// True when any held shift sits on the candidate's calendar day. With the
/// shipped template this is implied by the weekend rule, but templates may
/// change, so it is checked independently.
pub fn overlap_conflict(held: &[&Shift], candidate: &Shift) -> bool {
    held.iter()
        .any(|s| s.date == candidate.date && s.day == candidate.day)
}

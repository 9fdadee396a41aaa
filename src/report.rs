use crate::allocator::{satisfaction_score, AllocationOutcome, UNRANKED_PENALTY};
use crate::model::{PersonId, Roster, ShiftId};
use crate::preferences::PreferenceStore;
use std::fmt;

/// How a person's first assigned shift relates to what they asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOutcome {
    /// 1-based position in the liked list.
    Ranked(u32),
    /// Assigned one of their least-wanted shifts.
    Disliked,
    /// Assigned, but the shift appears in neither list.
    Unranked,
    /// Person never submitted a complete preference set.
    NoPreferences,
    /// Run ended with no shift for this person.
    Unassigned,
}

impl fmt::Display for RankOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankOutcome::Ranked(n) => write!(f, "#{n}"),
            RankOutcome::Disliked => f.write_str("DISLIKED"),
            RankOutcome::Unranked => f.write_str("NOT-RANKED"),
            RankOutcome::NoPreferences => f.write_str("NO-PREFS"),
            RankOutcome::Unassigned => f.write_str("UNASSIGNED"),
        }
    }
}

impl RankOutcome {
    /// Sort key, best outcome first.
    fn order(self) -> u32 {
        match self {
            RankOutcome::Ranked(n) => n,
            RankOutcome::Unranked => 100,
            RankOutcome::Disliked => 999,
            RankOutcome::NoPreferences => 1_000,
            RankOutcome::Unassigned => 1_001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonResult {
    pub person: PersonId,
    pub display_name: String,
    pub shifts: Vec<ShiftId>,
    pub first_shift: RankOutcome,
}

/// Post-hoc view of how well a run served people, best to worst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatisfactionReport {
    pub rows: Vec<PersonResult>,
    pub top_three: usize,
    pub ranked: usize,
    pub penalized: usize,
    pub unassigned: usize,
}

impl SatisfactionReport {
    pub fn build(
        roster: &Roster,
        store: &PreferenceStore,
        outcome: &AllocationOutcome,
    ) -> Self {
        let mut rows: Vec<PersonResult> = roster
            .reporters()
            .map(|person| {
                let shifts = outcome
                    .assignments
                    .get(&person.id)
                    .cloned()
                    .unwrap_or_default();
                let first_shift = match (shifts.first(), store.get(&person.id)) {
                    (None, _) => RankOutcome::Unassigned,
                    (Some(_), None) => RankOutcome::NoPreferences,
                    (Some(&shift), Some(prefs)) => {
                        if prefs.is_disliked(shift) {
                            RankOutcome::Disliked
                        } else {
                            match satisfaction_score(prefs, shift) {
                                UNRANKED_PENALTY => RankOutcome::Unranked,
                                rank => RankOutcome::Ranked(rank),
                            }
                        }
                    }
                };
                PersonResult {
                    person: person.id.clone(),
                    display_name: person.display_name.clone(),
                    shifts,
                    first_shift,
                }
            })
            .collect();

        rows.sort_by_key(|r| (r.first_shift.order(), r.person.clone()));

        let top_three = rows
            .iter()
            .filter(|r| matches!(r.first_shift, RankOutcome::Ranked(n) if n <= 3))
            .count();
        let ranked = rows
            .iter()
            .filter(|r| matches!(r.first_shift, RankOutcome::Ranked(_)))
            .count();
        let penalized = rows
            .iter()
            .filter(|r| {
                matches!(r.first_shift, RankOutcome::Disliked | RankOutcome::Unranked)
            })
            .count();
        let unassigned = rows
            .iter()
            .filter(|r| r.first_shift == RankOutcome::Unassigned)
            .count();

        Self { rows, top_three, ranked, penalized, unassigned }
    }
}

/// Customizable rendering of a report (plain text, future HTML, ...).
pub trait ReportRenderer {
    fn render(&self, report: &SatisfactionReport) -> String;
}

/// Plain-text table, best-served people first.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl ReportRenderer for TextRenderer {
    fn render(&self, report: &SatisfactionReport) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<20} {:<20} {:<12}\n",
            "Person", "Shifts", "First rank"
        ));
        for row in &report.rows {
            let shifts = row
                .shifts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&format!(
                "{:<20} {:<20} {:<12}\n",
                row.display_name, shifts, row.first_shift
            ));
        }
        out.push_str(&format!(
            "\ntop-3 picks: {}  ranked: {}  penalty cases: {}  unassigned: {}\n",
            report.top_three, report.ranked, report.penalized, report.unassigned
        ));
        out
    }
}

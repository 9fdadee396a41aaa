use crate::model::{PersonId, Shift, ShiftCategory, ShiftId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Required list lengths for a submission to count as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRules {
    pub liked_len: usize,
    pub disliked_len: usize,
}

impl Default for PreferenceRules {
    fn default() -> Self {
        Self { liked_len: 12, disliked_len: 6 }
    }
}

/// Raw submission as it arrives from a person (or from `preferences.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSubmission {
    /// Most-wanted shifts, best first.
    pub liked: Vec<ShiftId>,
    /// Least-wanted shifts, unordered.
    pub disliked: Vec<ShiftId>,
    /// Rank per category, lower is preferred. Consulted only as a fallback.
    #[serde(default)]
    pub category_rank: BTreeMap<ShiftCategory, u8>,
}

/// Why a submission was rejected at load time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreferenceIssue {
    #[error("liked list has {got} entries, expected {expected}")]
    LikedLength { expected: usize, got: usize },
    #[error("disliked list has {got} entries, expected {expected}")]
    DislikedLength { expected: usize, got: usize },
    #[error("shift {0} appears more than once")]
    Duplicate(ShiftId),
    #[error("shift {0} appears in both liked and disliked")]
    LikedDislikedOverlap(ShiftId),
    #[error("shift {0} does not exist in the calendar")]
    UnknownShift(ShiftId),
}

/// Validated preference set. Only complete, internally consistent
/// submissions become one of these; anything else routes the person to the
/// random-fallback phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceSet {
    liked: Vec<ShiftId>,
    disliked: HashSet<ShiftId>,
    /// Categories in fallback order: ascending rank, ties by category.
    categories: Vec<ShiftCategory>,
}

impl PreferenceSet {
    fn build(
        sub: &PreferenceSubmission,
        rules: PreferenceRules,
        known: &HashSet<ShiftId>,
    ) -> Result<Self, PreferenceIssue> {
        if sub.liked.len() != rules.liked_len {
            return Err(PreferenceIssue::LikedLength {
                expected: rules.liked_len,
                got: sub.liked.len(),
            });
        }
        if sub.disliked.len() != rules.disliked_len {
            return Err(PreferenceIssue::DislikedLength {
                expected: rules.disliked_len,
                got: sub.disliked.len(),
            });
        }

        let mut seen = HashSet::with_capacity(sub.liked.len() + sub.disliked.len());
        for &id in &sub.liked {
            if !known.contains(&id) {
                return Err(PreferenceIssue::UnknownShift(id));
            }
            if !seen.insert(id) {
                return Err(PreferenceIssue::Duplicate(id));
            }
        }
        let mut disliked = HashSet::with_capacity(sub.disliked.len());
        for &id in &sub.disliked {
            if !known.contains(&id) {
                return Err(PreferenceIssue::UnknownShift(id));
            }
            if sub.liked.contains(&id) {
                return Err(PreferenceIssue::LikedDislikedOverlap(id));
            }
            if !disliked.insert(id) {
                return Err(PreferenceIssue::Duplicate(id));
            }
        }

        // Unranked categories sort after ranked ones, in declaration order.
        let mut categories: Vec<(u8, ShiftCategory)> = ShiftCategory::ALL
            .iter()
            .map(|&c| (sub.category_rank.get(&c).copied().unwrap_or(u8::MAX), c))
            .collect();
        categories.sort();

        Ok(Self {
            liked: sub.liked.clone(),
            disliked,
            categories: categories.into_iter().map(|(_, c)| c).collect(),
        })
    }

    pub fn liked(&self) -> &[ShiftId] {
        &self.liked
    }

    pub fn is_liked(&self, id: ShiftId) -> bool {
        self.liked.contains(&id)
    }

    pub fn is_disliked(&self, id: ShiftId) -> bool {
        self.disliked.contains(&id)
    }

    /// 0-based position in the liked list, best first.
    pub fn rank_of(&self, id: ShiftId) -> Option<usize> {
        self.liked.iter().position(|&s| s == id)
    }

    /// Categories in fallback search order (best first).
    pub fn categories_by_rank(&self) -> &[ShiftCategory] {
        &self.categories
    }
}

/// In-memory view of everyone's validated preferences for one run.
#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    entries: HashMap<PersonId, PreferenceSet>,
    rejected: Vec<(PersonId, PreferenceIssue)>,
}

impl PreferenceStore {
    /// Validate raw submissions against the rules and the calendar. Invalid
    /// submissions are kept as diagnostics, not errors: the person simply has
    /// no preference set and will be assigned via the fallback phase.
    pub fn load(
        submissions: &BTreeMap<PersonId, PreferenceSubmission>,
        rules: PreferenceRules,
        calendar: &[Shift],
    ) -> Self {
        let known: HashSet<ShiftId> = calendar.iter().map(|s| s.id).collect();
        let mut entries = HashMap::new();
        let mut rejected = Vec::new();

        for (person, sub) in submissions {
            match PreferenceSet::build(sub, rules, &known) {
                Ok(set) => {
                    entries.insert(person.clone(), set);
                }
                Err(issue) => rejected.push((person.clone(), issue)),
            }
        }

        Self { entries, rejected }
    }

    pub fn get(&self, person: &PersonId) -> Option<&PreferenceSet> {
        self.entries.get(person)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Submissions that failed validation, in submission-file order.
    pub fn rejected(&self) -> &[(PersonId, PreferenceIssue)] {
        &self.rejected
    }
}

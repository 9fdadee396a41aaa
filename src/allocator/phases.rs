use super::conflicts::{overlap_conflict, same_weekend_conflict};
use super::scoring::{satisfaction_score, UNASSIGNED_PENALTY};
use super::types::{AllocationOutcome, AllocationWarning, SecondPassOrder};
use super::Allocator;
use crate::model::{Person, PersonId, Shift, ShiftId};
use crate::preferences::PreferenceSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Mutable state threaded through the phases of one run. Owns the run-local
/// RNG; nothing here outlives the run.
struct RunState {
    rng: StdRng,
    assignments: BTreeMap<PersonId, Vec<ShiftId>>,
    occupancy: BTreeMap<ShiftId, Vec<PersonId>>,
    warnings: Vec<AllocationWarning>,
}

impl RunState {
    fn new(alloc: &Allocator, reporters: &[&Person]) -> Self {
        Self {
            rng: StdRng::seed_from_u64(alloc.config().seed),
            assignments: reporters
                .iter()
                .map(|p| (p.id.clone(), Vec::new()))
                .collect(),
            occupancy: alloc
                .calendar
                .iter()
                .map(|s| (s.id, Vec::new()))
                .collect(),
            warnings: Vec::new(),
        }
    }

    fn held(&self, person: &PersonId) -> &[ShiftId] {
        self.assignments
            .get(person)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn assign(&mut self, person: &PersonId, shift: ShiftId) {
        self.assignments
            .entry(person.clone())
            .or_default()
            .push(shift);
        self.occupancy.entry(shift).or_default().push(person.clone());
    }
}

pub(super) fn run(alloc: &Allocator, people: &[Person]) -> AllocationOutcome {
    let reporters: Vec<&Person> = people.iter().filter(|p| !p.is_manager).collect();
    let mut state = RunState::new(alloc, &reporters);

    // Phase 0: roster order preserved on both sides of the split.
    let mut with_prefs: Vec<PersonId> = Vec::new();
    let mut without_prefs: Vec<PersonId> = Vec::new();
    for person in &reporters {
        if alloc.store.get(&person.id).is_some() {
            with_prefs.push(person.id.clone());
        } else {
            without_prefs.push(person.id.clone());
        }
    }

    first_pass(alloc, &mut state, &with_prefs);
    if alloc.config().max_shifts_per_person >= 2 {
        second_pass(alloc, &mut state, &with_prefs);
    }
    fallback_pass(alloc, &mut state, &without_prefs);

    finalize(alloc, state)
}

/// Phase 1: everyone with complete preferences gets a shot at one shift, in
/// seeded-shuffled order. The shuffle, not the rank, decides who wins a
/// contested top choice.
fn first_pass(alloc: &Allocator, state: &mut RunState, with_prefs: &[PersonId]) {
    let mut order = with_prefs.to_vec();
    order.shuffle(&mut state.rng);

    for person in &order {
        let Some(prefs) = alloc.store.get(person) else {
            continue;
        };
        let found = try_liked(alloc, state, person, prefs)
            .or_else(|| try_category(alloc, state, person, prefs, true));
        match found {
            Some(shift) => state.assign(person, shift),
            None => state
                .warnings
                .push(AllocationWarning::FirstShiftUnassigned(person.clone())),
        }
    }
}

/// Phase 2: order by first-shift satisfaction, ties broken by an independent
/// seeded draw, then rerun the same search for a second shift.
fn second_pass(alloc: &Allocator, state: &mut RunState, with_prefs: &[PersonId]) {
    // One tie-break draw per person, taken in roster order so the sequence
    // of RNG consumption is independent of phase-1 results.
    let mut scored: Vec<(u32, u64, PersonId)> = Vec::with_capacity(with_prefs.len());
    for person in with_prefs {
        let Some(prefs) = alloc.store.get(person) else {
            continue;
        };
        let score = match state.held(person).first() {
            Some(&shift) => satisfaction_score(prefs, shift),
            None => UNASSIGNED_PENALTY,
        };
        let tie: u64 = state.rng.gen();
        scored.push((score, tie, person.clone()));
    }

    match alloc.config().second_pass {
        SecondPassOrder::BestServedFirst => scored.sort_by_key(|&(s, t, _)| (s, t)),
        SecondPassOrder::WorstServedFirst => {
            scored.sort_by_key(|&(s, t, _)| (Reverse(s), t))
        }
    }

    for (_, _, person) in &scored {
        if state.held(person).len() >= alloc.config().max_shifts_per_person as usize {
            continue;
        }
        let Some(prefs) = alloc.store.get(person) else {
            continue;
        };
        let found = try_liked(alloc, state, person, prefs)
            .or_else(|| try_category(alloc, state, person, prefs, false));
        match found {
            Some(shift) => state.assign(person, shift),
            None => state
                .warnings
                .push(AllocationWarning::SecondShiftUnassigned(person.clone())),
        }
    }
}

/// Phase 3: people without complete preferences are filled from whatever is
/// still admissible, one seeded draw at a time. Admissibility is re-checked
/// between draws so one person's picks can never share a weekend.
fn fallback_pass(alloc: &Allocator, state: &mut RunState, without_prefs: &[PersonId]) {
    let max = alloc.config().max_shifts_per_person as usize;

    for person in without_prefs {
        state
            .warnings
            .push(AllocationWarning::RandomFallback(person.clone()));

        let needed = max.saturating_sub(state.held(person).len());
        let mut granted = 0;
        for _ in 0..needed {
            let available: Vec<ShiftId> = alloc
                .calendar
                .iter()
                .filter(|s| admissible(alloc, state, person, s))
                .map(|s| s.id)
                .collect();
            if available.is_empty() {
                break;
            }
            let pick = available[state.rng.gen_range(0..available.len())];
            state.assign(person, pick);
            granted += 1;
        }
        if granted < needed {
            state
                .warnings
                .push(AllocationWarning::Underassigned(person.clone()));
        }
    }
}

/// Scan the liked list in rank order for the first admissible shift not
/// already held.
fn try_liked(
    alloc: &Allocator,
    state: &RunState,
    person: &PersonId,
    prefs: &PreferenceSet,
) -> Option<ShiftId> {
    for &id in prefs.liked() {
        if state.held(person).contains(&id) {
            continue;
        }
        let Some(shift) = alloc.shift(id) else {
            continue;
        };
        if admissible(alloc, state, person, shift) {
            return Some(id);
        }
    }
    None
}

/// Category fallback: walk categories from best-ranked down, shifts in
/// calendar order within each. Disliked shifts are never taken here. The
/// first pass also skips liked shifts (they were just tried); the second
/// pass retries them since capacity may have moved on.
fn try_category(
    alloc: &Allocator,
    state: &RunState,
    person: &PersonId,
    prefs: &PreferenceSet,
    skip_liked: bool,
) -> Option<ShiftId> {
    for &category in prefs.categories_by_rank() {
        for shift in alloc.calendar {
            if state.held(person).contains(&shift.id) {
                continue;
            }
            if prefs.is_disliked(shift.id) {
                continue;
            }
            if skip_liked && prefs.is_liked(shift.id) {
                continue;
            }
            if shift.category() != category {
                continue;
            }
            if admissible(alloc, state, person, shift) {
                return Some(shift.id);
            }
        }
    }
    None
}

/// Open capacity plus both conflict predicates.
fn admissible(alloc: &Allocator, state: &RunState, person: &PersonId, shift: &Shift) -> bool {
    let filled = state
        .occupancy
        .get(&shift.id)
        .map(Vec::len)
        .unwrap_or_default();
    if filled >= shift.capacity as usize {
        return false;
    }
    let held: Vec<&Shift> = state
        .held(person)
        .iter()
        .filter_map(|&id| alloc.shift(id))
        .collect();
    !same_weekend_conflict(&held, shift) && !overlap_conflict(&held, shift)
}

fn finalize(alloc: &Allocator, mut state: RunState) -> AllocationOutcome {
    // Per-person lists come out chronological, not in assignment order.
    for shifts in state.assignments.values_mut() {
        shifts.sort_by_key(|&id| alloc.shift(id).map(|s| (s.date, s.window.start)));
    }

    let unfilled: Vec<ShiftId> = alloc
        .calendar
        .iter()
        .filter(|s| {
            state
                .occupancy
                .get(&s.id)
                .map(Vec::len)
                .unwrap_or_default()
                < s.capacity as usize
        })
        .map(|s| s.id)
        .collect();

    AllocationOutcome {
        assignments: state.assignments,
        occupancy: state.occupancy,
        warnings: state.warnings,
        unfilled,
    }
}

#![forbid(unsafe_code)]
use chrono::{NaiveDate, NaiveTime};
use std::collections::{BTreeMap, HashSet};
use weekendshift::{
    calendar::{generate, CalendarConfig},
    model::{Person, PersonId, Shift, ShiftDay, ShiftId},
    AllocationConfig, AllocationOutcome, AllocationWarning, Allocator, PreferenceRules,
    PreferenceStore, PreferenceSubmission, SecondPassOrder, ShiftTemplate, SlotSpec,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 3).unwrap() // a Saturday
}

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn standard_calendar(weeks: u32) -> Vec<Shift> {
    generate(&CalendarConfig {
        start_saturday: start(),
        weeks,
        id_base: 0,
        template: ShiftTemplate::standard(),
    })
    .unwrap()
}

/// Four single-capacity slots per weekend, handy for contention scenarios.
fn tight_calendar(weeks: u32) -> Vec<Shift> {
    let slot = |day, s, e| SlotSpec { day, start: t(s), end: t(e), capacity: 1 };
    generate(&CalendarConfig {
        start_saturday: start(),
        weeks,
        id_base: 0,
        template: ShiftTemplate {
            slots: vec![
                slot(ShiftDay::Saturday, 9, 17),
                slot(ShiftDay::Saturday, 17, 23),
                slot(ShiftDay::Sunday, 9, 17),
                slot(ShiftDay::Sunday, 17, 23),
            ],
        },
    })
    .unwrap()
}

fn people(n: usize) -> Vec<Person> {
    (1..=n)
        .map(|i| Person::new(format!("r{i}"), format!("Reporter {i}")))
        .collect()
}

fn pid(i: usize) -> PersonId {
    PersonId::new(format!("r{i}"))
}

fn ids(raw: &[u32]) -> Vec<ShiftId> {
    raw.iter().copied().map(ShiftId::new).collect()
}

fn submission(liked: &[u32], disliked: &[u32]) -> PreferenceSubmission {
    PreferenceSubmission {
        liked: ids(liked),
        disliked: ids(disliked),
        category_rank: BTreeMap::new(),
    }
}

fn config(max: u32, seed: u64) -> AllocationConfig {
    AllocationConfig {
        max_shifts_per_person: max,
        seed,
        second_pass: SecondPassOrder::BestServedFirst,
    }
}

/// The invariants every run must keep, whatever the inputs.
fn assert_invariants(calendar: &[Shift], outcome: &AllocationOutcome, max: usize) {
    for shift in calendar {
        let filled = outcome.occupancy.get(&shift.id).map(Vec::len).unwrap_or(0);
        assert!(
            filled <= shift.capacity as usize,
            "shift {} over capacity",
            shift.id
        );
        let expect_unfilled = filled < shift.capacity as usize;
        assert_eq!(outcome.unfilled.contains(&shift.id), expect_unfilled);
    }
    for (person, shifts) in &outcome.assignments {
        assert!(shifts.len() <= max, "{person} holds too many shifts");
        let weeks: HashSet<u32> = shifts
            .iter()
            .map(|id| calendar[id.as_u32() as usize].week_index)
            .collect();
        assert_eq!(weeks.len(), shifts.len(), "{person} doubled up on a weekend");
        for id in shifts {
            assert!(
                outcome.occupancy[id].contains(person),
                "occupancy map missing {person} on shift {id}"
            );
        }
    }
}

#[test]
fn scenario_everyone_fits_exactly() {
    // 4 shifts, capacities [2,1,2,1], 6 people, one shift each, everybody
    // ranks every shift.
    let cal = standard_calendar(1);
    let rules = PreferenceRules { liked_len: 4, disliked_len: 0 };
    let orders: [[u32; 4]; 6] = [
        [0, 1, 2, 3],
        [1, 2, 3, 0],
        [2, 3, 0, 1],
        [3, 0, 1, 2],
        [0, 2, 1, 3],
        [2, 0, 3, 1],
    ];
    let mut subs = BTreeMap::new();
    for (i, liked) in orders.iter().enumerate() {
        subs.insert(pid(i + 1), submission(liked, &[]));
    }
    let store = PreferenceStore::load(&subs, rules, &cal);
    assert_eq!(store.len(), 6);

    let outcome = Allocator::new(&cal, &store, config(1, 42))
        .unwrap()
        .run(&people(6));

    assert!(outcome.warnings.is_empty());
    assert!(outcome.unfilled.is_empty());
    for shifts in outcome.assignments.values() {
        assert_eq!(shifts.len(), 1);
    }
    for shift in &cal {
        assert_eq!(
            outcome.occupancy[&shift.id].len(),
            shift.capacity as usize
        );
    }
    assert_invariants(&cal, &outcome, 1);
}

#[test]
fn scenario_contested_single_slot() {
    // One weekend, single-capacity slots; two people want the same shift
    // first and rank nothing else.
    let slot = |day| SlotSpec { day, start: t(9), end: t(17), capacity: 1 };
    let cal = generate(&CalendarConfig {
        start_saturday: start(),
        weeks: 1,
        id_base: 0,
        template: ShiftTemplate { slots: vec![slot(ShiftDay::Saturday)] },
    })
    .unwrap();
    let rules = PreferenceRules { liked_len: 1, disliked_len: 0 };
    let mut subs = BTreeMap::new();
    subs.insert(pid(1), submission(&[0], &[]));
    subs.insert(pid(2), submission(&[0], &[]));
    let store = PreferenceStore::load(&subs, rules, &cal);

    let run = |seed| {
        Allocator::new(&cal, &store, config(1, seed))
            .unwrap()
            .run(&people(2))
    };

    let outcome = run(7);
    let assigned: Vec<&PersonId> = outcome
        .assignments
        .iter()
        .filter(|(_, s)| !s.is_empty())
        .map(|(p, _)| p)
        .collect();
    assert_eq!(assigned.len(), 1);
    assert_eq!(outcome.occupancy[&ShiftId::new(0)].len(), 1);
    // The loser has nowhere else to go: same weekend everywhere.
    assert_eq!(outcome.warnings.len(), 1);
    assert!(matches!(
        outcome.warnings[0],
        AllocationWarning::FirstShiftUnassigned(_)
    ));

    // Same seed reproduces the same winner; the outcome is fully equal.
    assert_eq!(run(7), outcome);
    assert_invariants(&cal, &outcome, 1);
}

#[test]
fn incomplete_submission_routes_to_random_fallback() {
    let cal = standard_calendar(6);
    let rules = PreferenceRules { liked_len: 10, disliked_len: 5 };
    let mut subs = BTreeMap::new();
    // Nine liked entries, one short: must not count as submitted.
    subs.insert(
        pid(1),
        submission(&[0, 1, 2, 4, 5, 6, 8, 9, 10], &[3, 7, 11, 12, 13]),
    );
    let store = PreferenceStore::load(&subs, rules, &cal);
    assert!(store.get(&pid(1)).is_none());

    let outcome = Allocator::new(&cal, &store, config(2, 42))
        .unwrap()
        .run(&people(1));

    assert!(outcome
        .warnings
        .iter()
        .any(|w| matches!(w, AllocationWarning::RandomFallback(p) if *p == pid(1))));
    // Plenty of room: the fallback still fills them up.
    assert_eq!(outcome.assignments[&pid(1)].len(), 2);
    assert_invariants(&cal, &outcome, 2);
}

#[test]
fn weekend_conflict_falls_through_to_category_search() {
    // Both liked shifts sit on weekend 1; the second must come from the
    // category fallback on weekend 2, not crash or double-book.
    let cal = standard_calendar(2);
    let rules = PreferenceRules { liked_len: 2, disliked_len: 0 };
    let mut subs = BTreeMap::new();
    subs.insert(pid(1), submission(&[0, 2], &[]));
    let store = PreferenceStore::load(&subs, rules, &cal);

    let outcome = Allocator::new(&cal, &store, config(2, 42))
        .unwrap()
        .run(&people(1));

    let shifts = &outcome.assignments[&pid(1)];
    assert_eq!(shifts.len(), 2);
    assert_eq!(shifts[0], ShiftId::new(0));
    // Second shift landed on the other weekend.
    assert_eq!(cal[shifts[1].as_u32() as usize].week_index, 2);
    assert!(outcome.warnings.is_empty());
    assert_invariants(&cal, &outcome, 2);
}

#[test]
fn scenario_nobody_submits() {
    let cal = standard_calendar(2);
    let store = PreferenceStore::load(&BTreeMap::new(), PreferenceRules::default(), &cal);

    let outcome = Allocator::new(&cal, &store, config(2, 42))
        .unwrap()
        .run(&people(5));

    // Room for one shift per person per weekend: everyone gets filled.
    for i in 1..=5 {
        assert_eq!(outcome.assignments[&pid(i)].len(), 2);
    }
    assert_eq!(outcome.warnings.len(), 5);
    assert!(outcome
        .warnings
        .iter()
        .all(|w| matches!(w, AllocationWarning::RandomFallback(_))));
    assert_invariants(&cal, &outcome, 2);
}

#[test]
fn random_fallback_exhausts_capacity_then_warns() {
    // Six slots, seven people, one shift each: exactly one person misses out.
    let cal = standard_calendar(1);
    let store = PreferenceStore::load(&BTreeMap::new(), PreferenceRules::default(), &cal);

    let outcome = Allocator::new(&cal, &store, config(1, 42))
        .unwrap()
        .run(&people(7));

    let assigned = outcome
        .assignments
        .values()
        .filter(|s| !s.is_empty())
        .count();
    assert_eq!(assigned, 6);
    assert!(outcome.unfilled.is_empty());
    let underassigned = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, AllocationWarning::Underassigned(_)))
        .count();
    assert_eq!(underassigned, 1);
    assert_invariants(&cal, &outcome, 1);
}

#[test]
fn preference_holders_beat_fallback_people_to_scarce_slots() {
    // r1 submitted, r2 did not. The single slot goes to r1 on every seed:
    // the fallback phase only ever sees what the preference passes left.
    let cal = generate(&CalendarConfig {
        start_saturday: start(),
        weeks: 1,
        id_base: 0,
        template: ShiftTemplate {
            slots: vec![SlotSpec {
                day: ShiftDay::Saturday,
                start: t(9),
                end: t(17),
                capacity: 1,
            }],
        },
    })
    .unwrap();
    let rules = PreferenceRules { liked_len: 1, disliked_len: 0 };
    let mut subs = BTreeMap::new();
    subs.insert(pid(1), submission(&[0], &[]));
    let store = PreferenceStore::load(&subs, rules, &cal);

    for seed in 0..10 {
        let outcome = Allocator::new(&cal, &store, config(1, seed))
            .unwrap()
            .run(&people(2));
        assert_eq!(outcome.assignments[&pid(1)], ids(&[0]));
        assert!(outcome.assignments[&pid(2)].is_empty());
    }
}

#[test]
fn second_pass_order_decides_the_contested_shift() {
    // Two people with identical lists over single-capacity slots. Whoever
    // wins shift 0 in the shuffle scores rank 1, the other gets shift 1 at
    // rank 2. Shift 4 on weekend 2 is the contested second pick.
    let cal = tight_calendar(2);
    let rules = PreferenceRules { liked_len: 4, disliked_len: 2 };
    let mut subs = BTreeMap::new();
    subs.insert(pid(1), submission(&[0, 1, 4, 5], &[6, 7]));
    subs.insert(pid(2), submission(&[0, 1, 4, 5], &[6, 7]));
    let store = PreferenceStore::load(&subs, rules, &cal);

    for seed in 0..10 {
        for order in [
            SecondPassOrder::BestServedFirst,
            SecondPassOrder::WorstServedFirst,
        ] {
            let cfg = AllocationConfig {
                max_shifts_per_person: 2,
                seed,
                second_pass: order,
            };
            let outcome = Allocator::new(&cal, &store, cfg).unwrap().run(&people(2));

            let holder_of = |id: u32| -> PersonId {
                outcome.occupancy[&ShiftId::new(id)][0].clone()
            };
            let best = holder_of(0); // rank-1 first shift
            let worst = holder_of(1); // rank-2 first shift
            assert_ne!(best, worst);

            let contested_winner = holder_of(4);
            match order {
                SecondPassOrder::BestServedFirst => assert_eq!(contested_winner, best),
                SecondPassOrder::WorstServedFirst => assert_eq!(contested_winner, worst),
            }
            assert!(outcome.warnings.is_empty());
            assert_invariants(&cal, &outcome, 2);
        }
    }
}

#[test]
fn disliked_shifts_are_never_taken_in_category_fallback() {
    // r1's liked shifts are all full before their turn can matter; the
    // category fallback must step around the disliked ones.
    let cal = tight_calendar(2);
    let rules = PreferenceRules { liked_len: 2, disliked_len: 4 };
    let mut subs = BTreeMap::new();
    // Likes only weekend-1 Saturday slots, dislikes everything on Sunday.
    subs.insert(pid(1), submission(&[0, 1], &[2, 3, 6, 7]));
    subs.insert(pid(2), submission(&[0, 1], &[2, 3, 6, 7]));
    subs.insert(pid(3), submission(&[0, 1], &[2, 3, 6, 7]));
    let store = PreferenceStore::load(&subs, rules, &cal);

    let outcome = Allocator::new(&cal, &store, config(1, 42))
        .unwrap()
        .run(&people(3));

    // Two win the liked Saturday slots; the third may only use weekend-2
    // Saturday slots (4, 5), never the disliked Sunday ones.
    for shifts in outcome.assignments.values() {
        assert_eq!(shifts.len(), 1);
        assert!(![2u32, 3, 6, 7].map(ShiftId::new).contains(&shifts[0]));
    }
    assert_invariants(&cal, &outcome, 1);
}

#[test]
fn equal_inputs_and_seed_are_byte_identical() {
    let cal = standard_calendar(6);
    let rules = PreferenceRules { liked_len: 6, disliked_len: 3 };
    let mut subs = BTreeMap::new();
    for i in 1..=12u32 {
        let base = (i * 3) % 24;
        let liked: Vec<u32> = (0..6).map(|k| (base + k * 4) % 24).collect();
        let disliked: Vec<u32> = (0..24)
            .filter(|id| !liked.contains(id))
            .take(3)
            .collect();
        subs.insert(pid(i as usize), submission(&liked, &disliked));
    }
    let store = PreferenceStore::load(&subs, rules, &cal);
    let roster = people(15); // a few without submissions

    let a = Allocator::new(&cal, &store, config(2, 1234))
        .unwrap()
        .run(&roster);
    let b = Allocator::new(&cal, &store, config(2, 1234))
        .unwrap()
        .run(&roster);

    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a.assignments).unwrap(),
        serde_json::to_string(&b.assignments).unwrap()
    );
    assert_eq!(a.warning_messages(), b.warning_messages());
    assert_invariants(&cal, &a, 2);
}

#[test]
fn invariants_hold_across_seeds() {
    let cal = standard_calendar(6);
    let rules = PreferenceRules { liked_len: 6, disliked_len: 3 };
    let mut subs = BTreeMap::new();
    for i in 1..=15u32 {
        let liked: Vec<u32> = (0..6).map(|k| (i + k * 5) % 24).collect();
        let disliked: Vec<u32> = (0..24)
            .filter(|id| !liked.contains(id))
            .take(3)
            .collect();
        subs.insert(pid(i as usize), submission(&liked, &disliked));
    }
    let store = PreferenceStore::load(&subs, rules, &cal);
    let roster = people(30);

    for seed in 0..6 {
        let outcome = Allocator::new(&cal, &store, config(2, seed))
            .unwrap()
            .run(&roster);
        assert_invariants(&cal, &outcome, 2);
    }
}

#[test]
fn managers_never_receive_shifts() {
    let cal = standard_calendar(2);
    let store = PreferenceStore::load(&BTreeMap::new(), PreferenceRules::default(), &cal);
    let mut roster = people(3);
    roster.push(Person::manager("admin", "Admin"));

    let outcome = Allocator::new(&cal, &store, config(2, 42))
        .unwrap()
        .run(&roster);

    assert!(!outcome.assignments.contains_key(&PersonId::new("admin")));
    for assigned in outcome.occupancy.values() {
        assert!(!assigned.contains(&PersonId::new("admin")));
    }
}

#[test]
fn assigned_lists_come_out_chronological() {
    // Liked list deliberately reversed in time; the final per-person list
    // must still read in calendar order.
    let cal = standard_calendar(3);
    let rules = PreferenceRules { liked_len: 2, disliked_len: 0 };
    let mut subs = BTreeMap::new();
    subs.insert(pid(1), submission(&[8, 0], &[]));
    let store = PreferenceStore::load(&subs, rules, &cal);

    let outcome = Allocator::new(&cal, &store, config(2, 42))
        .unwrap()
        .run(&people(1));

    let shifts = &outcome.assignments[&pid(1)];
    assert_eq!(shifts, &ids(&[0, 8]));
}

#[test]
fn bad_configurations_are_rejected_up_front() {
    let cal = standard_calendar(1);
    let store = PreferenceStore::load(&BTreeMap::new(), PreferenceRules::default(), &cal);

    assert!(Allocator::new(&[], &store, config(2, 42)).is_err());
    assert!(Allocator::new(&cal, &store, config(0, 42)).is_err());

    let mut dup = cal.clone();
    dup[1] = dup[0].clone();
    assert!(Allocator::new(&dup, &store, config(2, 42)).is_err());
}

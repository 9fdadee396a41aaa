use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strong id for a person (username in the persisted files).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roster member. Managers administer runs and never receive shifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub display_name: String,
    #[serde(default)]
    pub is_manager: bool,
}

impl Person {
    pub fn new<I: AsRef<str>, D: Into<String>>(id: I, display_name: D) -> Self {
        Self {
            id: PersonId::new(id),
            display_name: display_name.into(),
            is_manager: false,
        }
    }

    pub fn manager<I: AsRef<str>, D: Into<String>>(id: I, display_name: D) -> Self {
        Self {
            id: PersonId::new(id),
            display_name: display_name.into(),
            is_manager: true,
        }
    }
}

/// Strong id for a shift. Sequential within one generated calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftId(u32);

impl ShiftId {
    pub fn new(n: u32) -> Self {
        Self(n)
    }
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weekend day a shift falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftDay {
    Saturday,
    Sunday,
}

impl fmt::Display for ShiftDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShiftDay::Saturday => "Saturday",
            ShiftDay::Sunday => "Sunday",
        })
    }
}

/// Time-of-day window of a shift, `end` strictly after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, String> {
        if end <= start {
            return Err("window end must be strictly after start".to_string());
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Coarse shift buckets used for the category fallback ranking.
///
/// Sunday splits at noon; everything on Saturday is one bucket, matching the
/// preference forms people fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftCategory {
    Saturday,
    SundayDay,
    SundayEvening,
}

impl ShiftCategory {
    pub const ALL: [ShiftCategory; 3] = [
        ShiftCategory::Saturday,
        ShiftCategory::SundayDay,
        ShiftCategory::SundayEvening,
    ];

    pub fn of(day: ShiftDay, window: TimeWindow) -> Self {
        match day {
            ShiftDay::Saturday => ShiftCategory::Saturday,
            ShiftDay::Sunday => {
                let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
                if window.start < noon {
                    ShiftCategory::SundayDay
                } else {
                    ShiftCategory::SundayEvening
                }
            }
        }
    }
}

impl fmt::Display for ShiftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShiftCategory::Saturday => "saturday",
            ShiftCategory::SundayDay => "sunday_day",
            ShiftCategory::SundayEvening => "sunday_evening",
        })
    }
}

/// One bookable slot on a specific date. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub date: NaiveDate,
    pub day: ShiftDay,
    pub window: TimeWindow,
    /// How many people this shift can hold.
    pub capacity: u32,
    /// 1-based grouping of a Saturday+Sunday pair into one weekend.
    pub week_index: u32,
}

impl Shift {
    pub fn category(&self) -> ShiftCategory {
        ShiftCategory::of(self.day, self.window)
    }
}

/// The people side of the system. Shifts live in the generated calendar.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Roster {
    pub people: Vec<Person>,
}

impl Roster {
    pub fn find_person<'a>(&'a self, id: &PersonId) -> Option<&'a Person> {
        self.people.iter().find(|p| &p.id == id)
    }

    /// Everyone who participates in allocation.
    pub fn reporters(&self) -> impl Iterator<Item = &Person> {
        self.people.iter().filter(|p| !p.is_manager)
    }
}

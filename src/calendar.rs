use crate::model::{Shift, ShiftDay, ShiftId, TimeWindow};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One slot of the per-weekend template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub day: ShiftDay,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub capacity: u32,
}

/// Fixed list of slots applied identically to every weekend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTemplate {
    pub slots: Vec<SlotSpec>,
}

impl ShiftTemplate {
    /// Sat day ×2, Sat evening ×1, Sun day ×2, Sun evening ×1.
    pub fn standard() -> Self {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        Self {
            slots: vec![
                SlotSpec { day: ShiftDay::Saturday, start: t(9), end: t(17), capacity: 2 },
                SlotSpec { day: ShiftDay::Saturday, start: t(17), end: t(23), capacity: 1 },
                SlotSpec { day: ShiftDay::Sunday, start: t(9), end: t(17), capacity: 2 },
                SlotSpec { day: ShiftDay::Sunday, start: t(17), end: t(23), capacity: 1 },
            ],
        }
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.slots.is_empty() {
            return Err(CalendarError::EmptyTemplate);
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.capacity == 0 {
                return Err(CalendarError::ZeroCapacity { slot: i });
            }
            if slot.end <= slot.start {
                return Err(CalendarError::InvalidWindow { slot: i });
            }
        }
        Ok(())
    }

    /// Total people the template can hold per weekend.
    pub fn weekend_capacity(&self) -> u32 {
        self.slots.iter().map(|s| s.capacity).sum()
    }
}

/// Inputs for one calendar generation. Output depends on nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Date of the first Saturday in the period.
    pub start_saturday: NaiveDate,
    pub weeks: u32,
    /// First shift id handed out (deployments differ on 0 vs 1).
    #[serde(default)]
    pub id_base: u32,
    pub template: ShiftTemplate,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CalendarError {
    #[error("template must contain at least one slot")]
    EmptyTemplate,
    #[error("template slot {slot} has zero capacity")]
    ZeroCapacity { slot: usize },
    #[error("template slot {slot} has end not after start")]
    InvalidWindow { slot: usize },
    #[error("start date {0} is not a Saturday")]
    StartNotSaturday(NaiveDate),
    #[error("week count must be at least 1")]
    ZeroWeeks,
}

/// Generate the full shift calendar for a scheduling period.
///
/// Pure function of the config: ids are sequential from `id_base` in template
/// order within each week, weeks ascending, so preference submissions keep
/// referencing the same shifts across runs.
pub fn generate(cfg: &CalendarConfig) -> Result<Vec<Shift>, CalendarError> {
    cfg.template.validate()?;
    if cfg.weeks == 0 {
        return Err(CalendarError::ZeroWeeks);
    }
    if cfg.start_saturday.weekday() != Weekday::Sat {
        return Err(CalendarError::StartNotSaturday(cfg.start_saturday));
    }

    let mut shifts = Vec::with_capacity(cfg.weeks as usize * cfg.template.slots.len());
    let mut next_id = cfg.id_base;

    for week in 0..cfg.weeks {
        let saturday = cfg.start_saturday + Duration::weeks(i64::from(week));
        for slot in &cfg.template.slots {
            let date = match slot.day {
                ShiftDay::Saturday => saturday,
                ShiftDay::Sunday => saturday + Duration::days(1),
            };
            shifts.push(Shift {
                id: ShiftId::new(next_id),
                date,
                day: slot.day,
                window: TimeWindow { start: slot.start, end: slot.end },
                capacity: slot.capacity,
                week_index: week + 1,
            });
            next_id += 1;
        }
    }

    Ok(shifts)
}

/// Next Saturday strictly relative to `today` (returns `today` if it already
/// is a Saturday), the rule used to anchor a new scheduling period.
pub fn next_saturday(today: NaiveDate) -> NaiveDate {
    let offset = (Weekday::Sat.num_days_from_monday() + 7
        - today.weekday().num_days_from_monday())
        % 7;
    today + Duration::days(i64::from(offset))
}

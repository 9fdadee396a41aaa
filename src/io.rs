use crate::allocator::AllocationOutcome;
use crate::model::{Person, PersonId, Roster, Shift, ShiftId};
use anyhow::{bail, Context};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Import people from CSV: header `username,display_name[,is_manager]`.
pub fn import_people_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Person>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let username = rec.get(0).context("missing username")?.trim();
        let display = rec.get(1).context("missing display_name")?.trim();
        if username.is_empty() || display.is_empty() {
            bail!("invalid people row (empty)");
        }
        let mut person = Person::new(username, display.to_string());
        if let Some(flag) = rec.get(2) {
            let flag = flag.trim();
            if !flag.is_empty() {
                person.is_manager = parse_bool(flag).with_context(|| {
                    format!("invalid is_manager value for username {username}")
                })?;
            }
        }
        out.push(person);
    }
    Ok(out)
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

/// Export the run as CSV, one row per shift:
/// header `id,date,day,time,capacity,assigned`.
pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    calendar: &[Shift],
    roster: &Roster,
    outcome: &AllocationOutcome,
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["id", "date", "day", "time", "capacity", "assigned"])?;
    for shift in calendar {
        let assigned = outcome
            .occupancy
            .get(&shift.id)
            .map(|people| {
                people
                    .iter()
                    .map(|pid| {
                        roster
                            .find_person(pid)
                            .map(|p| p.display_name.as_str())
                            .unwrap_or(pid.as_str())
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        w.write_record([
            shift.id.to_string().as_str(),
            shift.date.to_string().as_str(),
            shift.day.to_string().as_str(),
            shift.window.to_string().as_str(),
            shift.capacity.to_string().as_str(),
            assigned.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export the full outcome as pretty JSON.
pub fn export_outcome_json<P: AsRef<Path>>(
    path: P,
    outcome: &AllocationOutcome,
) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Document<'a> {
        assignments: &'a BTreeMap<PersonId, Vec<ShiftId>>,
        occupancy: &'a BTreeMap<ShiftId, Vec<PersonId>>,
        warnings: Vec<String>,
        unfilled: &'a [ShiftId],
    }
    let doc = Document {
        assignments: &outcome.assignments,
        occupancy: &outcome.occupancy,
        warnings: outcome.warning_messages(),
        unfilled: &outcome.unfilled,
    };
    let s = serde_json::to_string_pretty(&doc)?;
    fs::write(path, s)?;
    Ok(())
}

#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use weekendshift::{
    calendar, io,
    model::{PersonId, Roster, ShiftCategory, ShiftId},
    AllocationConfig, AllocationOutcome, Allocator, JsonStore, PreferenceStore,
    PreferenceSubmission, ReportRenderer, SatisfactionReport, SecondPassOrder, Settings,
    TextRenderer,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Weekend shift allocation from ranked preferences (no database)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Enable logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Data directory holding the JSON state files
    #[arg(long, global = true, default_value = "data")]
    data_dir: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a fresh scheduling period
    Init {
        /// First Saturday (YYYY-MM-DD); defaults to the next Saturday
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long, default_value_t = 6)]
        weeks: u32,
    },

    /// Import people from a CSV (`username,display_name[,is_manager]`)
    ImportPeople {
        #[arg(long)]
        csv: String,
    },

    /// Print the generated shift calendar
    Shifts,

    /// Record one person's preference submission
    Submit {
        #[arg(long)]
        person: String,
        /// Liked shift ids, best first: "0,4,8,..."
        #[arg(long)]
        liked: String,
        /// Disliked shift ids: "2,3,..."
        #[arg(long)]
        disliked: String,
        /// Category ranks: "saturday=1,sunday_day=2,sunday_evening=3"
        #[arg(long)]
        categories: Option<String>,
    },

    /// Run the allocation, persist the result and lock submissions
    Allocate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Give second-shift priority to the worst-served people
        #[arg(long)]
        worst_served_first: bool,
    },

    /// Satisfaction report for the persisted run
    Report,

    /// Export the persisted run
    Export {
        #[arg(long)]
        out_csv: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
    },

    /// Move the submission deadline (RFC3339 UTC)
    SetDeadline {
        #[arg(long)]
        when: String,
    },

    /// Lock or unlock preference submissions
    Lock {
        #[arg(long)]
        off: bool,
    },

    /// Snapshot all state files into the backup folder
    Backup,

    /// List available backups, newest first
    Backups,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let store = JsonStore::open(&cli.data_dir)?;
    let now = Utc::now();

    let code = match cli.cmd {
        Commands::Init { start, weeks } => {
            let start = start.unwrap_or_else(|| calendar::next_saturday(now.date_naive()));
            let settings = Settings::new(start, weeks, now);
            // Reject a bad period before anything references it.
            calendar::generate(&settings.calendar_config())?;
            store.save_settings(&settings)?;
            store.save_roster(&Roster::default())?;
            println!("initialized {} weekends starting {}", weeks, start);
            0
        }
        Commands::ImportPeople { csv } => {
            let people = io::import_people_csv(csv)?;
            let mut roster = store.load_roster().unwrap_or_default();
            let count = people.len();
            roster.people.extend(people);
            store.save_roster(&roster)?;
            println!("imported {count} people");
            0
        }
        Commands::Shifts => {
            let settings = store.load_settings()?;
            let shifts = calendar::generate(&settings.calendar_config())?;
            for s in &shifts {
                println!(
                    "{} | week {} | {} {} | {} | {} slot(s)",
                    s.id, s.week_index, s.day, s.date, s.window, s.capacity
                );
            }
            0
        }
        Commands::Submit { person, liked, disliked, categories } => {
            let submission = PreferenceSubmission {
                liked: parse_ids(&liked)?,
                disliked: parse_ids(&disliked)?,
                category_rank: categories
                    .as_deref()
                    .map(parse_categories)
                    .transpose()?
                    .unwrap_or_default(),
            };
            store.submit_preferences(&PersonId::new(&person), submission, now)?;
            println!("recorded preferences for {person}");
            0
        }
        Commands::Allocate { seed, worst_served_first } => {
            // Full snapshot first, so a bad run is recoverable.
            store.create_backup(now)?;

            let settings = store.load_settings()?;
            let roster = store.load_roster()?;
            let shifts = calendar::generate(&settings.calendar_config())?;
            let submissions = store.load_submissions()?;
            let prefs = PreferenceStore::load(&submissions, settings.rules, &shifts);

            for (person, issue) in prefs.rejected() {
                eprintln!("note: {person}: {issue} (routed to random fallback)");
            }

            let cfg = AllocationConfig {
                max_shifts_per_person: settings.max_shifts_per_person,
                seed,
                second_pass: if worst_served_first {
                    SecondPassOrder::WorstServedFirst
                } else {
                    SecondPassOrder::BestServedFirst
                },
            };
            let outcome = Allocator::new(&shifts, &prefs, cfg)?.run(&roster.people);
            store.finish_run(&outcome, now)?;

            for warning in &outcome.warnings {
                eprintln!("warning: {warning}");
            }
            println!(
                "assigned {} people across {} shifts ({} under-filled)",
                outcome.assignments.len(),
                shifts.len(),
                outcome.unfilled.len()
            );
            // Code 2 = completed with warnings
            if outcome.warnings.is_empty() {
                0
            } else {
                2
            }
        }
        Commands::Report => {
            let settings = store.load_settings()?;
            let roster = store.load_roster()?;
            let shifts = calendar::generate(&settings.calendar_config())?;
            let submissions = store.load_submissions()?;
            let prefs = PreferenceStore::load(&submissions, settings.rules, &shifts);
            let outcome = load_outcome(&store)?;
            let report = SatisfactionReport::build(&roster, &prefs, &outcome);
            print!("{}", TextRenderer.render(&report));
            0
        }
        Commands::Export { out_csv, out_json } => {
            let settings = store.load_settings()?;
            let roster = store.load_roster()?;
            let shifts = calendar::generate(&settings.calendar_config())?;
            let outcome = load_outcome(&store)?;
            if let Some(path) = out_csv {
                io::export_assignments_csv(path, &shifts, &roster, &outcome)?;
            }
            if let Some(path) = out_json {
                io::export_outcome_json(path, &outcome)?;
            }
            0
        }
        Commands::SetDeadline { when } => {
            let deadline: DateTime<Utc> = when.parse().context("deadline RFC3339")?;
            let mut settings = store.load_settings()?;
            settings.deadline = deadline;
            store.save_settings(&settings)?;
            0
        }
        Commands::Lock { off } => {
            let mut settings = store.load_settings()?;
            settings.locked = !off;
            store.save_settings(&settings)?;
            println!("submissions {}", if off { "unlocked" } else { "locked" });
            0
        }
        Commands::Backup => {
            let path = store.create_backup(now)?;
            println!("backup written to {}", path.display());
            0
        }
        Commands::Backups => {
            for info in store.list_backups()? {
                println!("{} ({} bytes)", info.path.display(), info.size);
            }
            0
        }
    };

    std::process::exit(code);
}

/// Rebuild an outcome view from the persisted run (warnings already
/// rendered at allocation time are not re-typed).
fn load_outcome(store: &JsonStore) -> Result<AllocationOutcome> {
    let Some(run) = store.load_run()? else {
        bail!("no allocation run has been persisted yet");
    };
    Ok(AllocationOutcome {
        assignments: run.assignments,
        occupancy: run.occupancy,
        warnings: Vec::new(),
        unfilled: run.unfilled,
    })
}

fn parse_ids(raw: &str) -> Result<Vec<ShiftId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map(ShiftId::new)
                .with_context(|| format!("invalid shift id: {s}"))
        })
        .collect()
}

fn parse_categories(raw: &str) -> Result<BTreeMap<ShiftCategory, u8>> {
    let mut out = BTreeMap::new();
    for chunk in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((name, rank)) = chunk.split_once('=') else {
            bail!("expected category=rank, got {chunk}");
        };
        let category = match name.trim() {
            "saturday" => ShiftCategory::Saturday,
            "sunday_day" => ShiftCategory::SundayDay,
            "sunday_evening" => ShiftCategory::SundayEvening,
            other => bail!("unknown category: {other}"),
        };
        let rank: u8 = rank.trim().parse().context("category rank")?;
        out.insert(category, rank);
    }
    Ok(out)
}

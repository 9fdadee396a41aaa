use crate::allocator::AllocationOutcome;
use crate::calendar::{CalendarConfig, ShiftTemplate};
use crate::model::{PersonId, Roster, ShiftId};
use crate::preferences::{PreferenceRules, PreferenceSubmission};
use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const ROSTER_FILE: &str = "roster.json";
const PREFERENCES_FILE: &str = "preferences.json";
const SETTINGS_FILE: &str = "settings.json";
const ASSIGNMENTS_FILE: &str = "assignments.json";
const BACKUP_DIR: &str = "backups";
const BACKUP_PREFIX: &str = "auto_backup_";
const BACKUP_KEEP: usize = 30;

/// Scheduling-period configuration plus the preference-write gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub start_saturday: NaiveDate,
    pub weeks: u32,
    pub template: ShiftTemplate,
    pub rules: PreferenceRules,
    pub max_shifts_per_person: u32,
    pub deadline: DateTime<Utc>,
    pub locked: bool,
}

impl Settings {
    pub fn new(start_saturday: NaiveDate, weeks: u32, now: DateTime<Utc>) -> Self {
        Self {
            start_saturday,
            weeks,
            template: ShiftTemplate::standard(),
            rules: PreferenceRules::default(),
            max_shifts_per_person: 2,
            deadline: now + Duration::days(7),
            locked: false,
        }
    }

    pub fn calendar_config(&self) -> CalendarConfig {
        CalendarConfig {
            start_saturday: self.start_saturday,
            weeks: self.weeks,
            id_base: 0,
            template: self.template.clone(),
        }
    }

    pub fn accepts_submissions(&self, now: DateTime<Utc>) -> bool {
        !self.locked && now <= self.deadline
    }
}

/// Persisted result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRun {
    pub assignments: BTreeMap<PersonId, Vec<ShiftId>>,
    pub occupancy: BTreeMap<ShiftId, Vec<PersonId>>,
    pub warnings: Vec<String>,
    pub unfilled: Vec<ShiftId>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("preferences are locked")]
    Locked,
    #[error("submission deadline has passed")]
    DeadlinePassed,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Serialize, Deserialize)]
struct BackupDocument {
    roster: Roster,
    preferences: BTreeMap<PersonId, PreferenceSubmission>,
    settings: Settings,
    assignments: Option<SavedRun>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub size: u64,
}

/// File-backed state: four JSON documents in one data directory, plus a
/// rotated backup folder. Writes are atomic (temp file + rename), so a crash
/// mid-save leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let base_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("creating data directory {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.base_dir.join(file)
    }

    fn write_atomic(&self, path: &Path, json: &[u8]) -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new_in(
            path.parent().unwrap_or_else(|| Path::new(".")),
        )
        .with_context(|| "creating temp file")?;
        tmp.write_all(json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).with_context(|| "atomic rename")?;
        Ok(())
    }

    fn save_json<T: Serialize>(&self, file: &str, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        self.write_atomic(&self.path(file), &json)
    }

    fn load_json<T: for<'de> Deserialize<'de>>(&self, file: &str) -> anyhow::Result<T> {
        let path = self.path(file);
        let data =
            fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", path.display()))
    }

    pub fn load_roster(&self) -> anyhow::Result<Roster> {
        self.load_json(ROSTER_FILE)
    }

    pub fn save_roster(&self, roster: &Roster) -> anyhow::Result<()> {
        self.save_json(ROSTER_FILE, roster)
    }

    /// Missing file reads as "nobody has submitted yet".
    pub fn load_submissions(
        &self,
    ) -> anyhow::Result<BTreeMap<PersonId, PreferenceSubmission>> {
        if !self.path(PREFERENCES_FILE).exists() {
            return Ok(BTreeMap::new());
        }
        self.load_json(PREFERENCES_FILE)
    }

    pub fn save_submissions(
        &self,
        submissions: &BTreeMap<PersonId, PreferenceSubmission>,
    ) -> anyhow::Result<()> {
        self.save_json(PREFERENCES_FILE, submissions)
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        self.load_json(SETTINGS_FILE)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        self.save_json(SETTINGS_FILE, settings)
    }

    pub fn load_run(&self) -> anyhow::Result<Option<SavedRun>> {
        if !self.path(ASSIGNMENTS_FILE).exists() {
            return Ok(None);
        }
        self.load_json(ASSIGNMENTS_FILE).map(Some)
    }

    /// Record one person's submission, refusing once the period is locked or
    /// the deadline has passed. The gate is what lets an allocation run treat
    /// the preference file as frozen input.
    pub fn submit_preferences(
        &self,
        person: &PersonId,
        submission: PreferenceSubmission,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let settings = self.load_settings()?;
        if settings.locked {
            return Err(StoreError::Locked);
        }
        if now > settings.deadline {
            return Err(StoreError::DeadlinePassed);
        }
        let mut submissions = self.load_submissions()?;
        submissions.insert(person.clone(), submission);
        self.save_submissions(&submissions)?;
        Ok(())
    }

    /// Persist a completed run and set the lock flag in the same operation,
    /// so no submission can slip in after assignments exist.
    pub fn finish_run(
        &self,
        outcome: &AllocationOutcome,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let saved = SavedRun {
            assignments: outcome.assignments.clone(),
            occupancy: outcome.occupancy.clone(),
            warnings: outcome.warning_messages(),
            unfilled: outcome.unfilled.clone(),
            completed_at: now,
        };
        self.save_json(ASSIGNMENTS_FILE, &saved)?;
        let mut settings = self.load_settings()?;
        settings.locked = true;
        self.save_settings(&settings)
    }

    /// Snapshot all state files into `backups/`, keeping the most recent
    /// `BACKUP_KEEP` snapshots.
    pub fn create_backup(&self, now: DateTime<Utc>) -> anyhow::Result<PathBuf> {
        let dir = self.path(BACKUP_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating backup directory {}", dir.display()))?;

        let doc = BackupDocument {
            roster: self.load_roster().unwrap_or_default(),
            preferences: self.load_submissions()?,
            settings: self.load_settings()?,
            assignments: self.load_run()?,
            timestamp: now,
        };
        let name = format!("{BACKUP_PREFIX}{}.json", now.format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);
        let json = serde_json::to_vec_pretty(&doc)?;
        self.write_atomic(&path, &json)?;

        for stale in self.backup_paths()?.into_iter().skip(BACKUP_KEEP) {
            fs::remove_file(&stale)
                .with_context(|| format!("pruning backup {}", stale.display()))?;
        }
        Ok(path)
    }

    /// Available backups, newest first.
    pub fn list_backups(&self) -> anyhow::Result<Vec<BackupInfo>> {
        let mut out = Vec::new();
        for path in self.backup_paths()? {
            let size = fs::metadata(&path)?.len();
            out.push(BackupInfo { path, size });
        }
        Ok(out)
    }

    /// Backup files sorted newest first (timestamped names sort that way
    /// when reversed).
    fn backup_paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        let dir = self.path(BACKUP_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        names.reverse();
        Ok(names.into_iter().map(|n| dir.join(n)).collect())
    }
}

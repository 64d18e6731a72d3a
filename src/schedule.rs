//! # Run cadence
//! Passive "due" computation plus the persisted last-run marker.
//!
//! Nothing here schedules work; callers ask whether a run is due and decide.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// Hours after the last completed run at which a new one becomes due.
pub const DUE_AFTER_HOURS: i64 = 48;

/// Visible state of the agent as the presentation layer shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Idle,
    Searching,
    Summarizing,
    Complete,
    Error,
}

impl AgentStatus {
    pub fn is_running(self) -> bool {
        matches!(self, AgentStatus::Searching | AgentStatus::Summarizing)
    }
}

pub fn due_after() -> ChronoDuration {
    ChronoDuration::hours(DUE_AFTER_HOURS)
}

/// Due when there was never a run or at least 48h have passed since it.
pub fn is_due(now: DateTime<Utc>, last_run: Option<DateTime<Utc>>) -> bool {
    match last_run {
        None => true,
        Some(ts) => now.signed_duration_since(ts) >= due_after(),
    }
}

pub fn next_run_at(last_run: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    last_run.map(|ts| ts + due_after())
}

#[derive(Debug, Serialize, Deserialize)]
struct Marker {
    last_run: DateTime<Utc>,
}

/// JSON file holding the timestamp of the last completed run.
#[derive(Debug, Clone)]
pub struct LastRunStore {
    path: PathBuf,
}

impl LastRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, unreadable or corrupt marker all read as "never ran".
    pub fn load(&self) -> Option<DateTime<Utc>> {
        let s = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Marker>(&s) {
            Ok(m) => Some(m.last_run),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "ignoring corrupt last-run marker");
                None
            }
        }
    }

    /// Atomic replace via tmp file + rename.
    pub fn save(&self, ts: DateTime<Utc>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string(&Marker { last_run: ts })?;
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(json.as_bytes())?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming marker into {}", self.path.display()))?;
        Ok(())
    }
}

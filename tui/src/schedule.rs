//! Update-check schedule
//!
//! The update walkthrough can postpone or switch off future checks. The
//! choice is persisted as a small TOML file in the user's data directory.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use popup_core::{Notifier, WalkthroughActions};

/// Errors reading or writing the schedule
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Failed to read or write the file
    #[error("update schedule I/O failed at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File content is not a valid schedule
    #[error("invalid update schedule: {0}")]
    Parse(#[from] toml::de::Error),

    /// Schedule could not be serialized
    #[error("failed to serialize update schedule: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted update-check preferences
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCheckSchedule {
    /// Never check again
    pub disabled: bool,
    /// Skip checks until this instant
    pub next_check: Option<DateTime<Utc>>,
}

impl UpdateCheckSchedule {
    /// `$XDG_DATA_HOME/popup-queue/update-checks.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("popup-queue").join("update-checks.toml"))
    }

    /// Load from `path`; a missing file yields the default schedule
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Write to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ScheduleError> {
        let io_err = |source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?).map_err(io_err)
    }

    /// Whether a check should run at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && self.next_check.map_or(true, |at| now >= at)
    }
}

/// Walkthrough side effects for the terminal host
///
/// URLs cannot be opened from inside the alternate screen, so they are
/// posted to the notice log instead.
pub struct TerminalActions {
    path: Option<PathBuf>,
    notifier: Rc<dyn Notifier>,
}

impl TerminalActions {
    /// Persist to `path` (nothing is written when `None`)
    pub fn new(path: Option<PathBuf>, notifier: Rc<dyn Notifier>) -> Self {
        Self { path, notifier }
    }

    /// Current schedule on disk
    pub fn schedule(&self) -> UpdateCheckSchedule {
        let Some(ref path) = self.path else {
            return UpdateCheckSchedule::default();
        };
        UpdateCheckSchedule::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring unreadable update schedule");
            UpdateCheckSchedule::default()
        })
    }

    fn update(&self, change: impl FnOnce(&mut UpdateCheckSchedule)) {
        let Some(ref path) = self.path else {
            return;
        };
        let mut schedule = self.schedule();
        change(&mut schedule);
        match schedule.save(path) {
            Ok(()) => tracing::info!(path = %path.display(), ?schedule, "Saved update schedule"),
            Err(e) => tracing::warn!(error = %e, "Failed to save update schedule"),
        }
    }
}

impl WalkthroughActions for TerminalActions {
    fn open_url(&self, url: &str) {
        self.notifier.notify(&format!("Open in your browser: {url}"));
    }

    fn defer_update_checks(&self, until: DateTime<Utc>) {
        self.update(|s| s.next_check = Some(until));
        self.notifier.notify(&format!(
            "Update checks postponed until {}",
            until.format("%Y-%m-%d")
        ));
    }

    fn disable_update_checks(&self) {
        self.update(|s| s.disabled = true);
    }
}

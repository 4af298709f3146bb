//! Run configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};

/// Default wall-clock limit for a single external command.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Default parent directory for incident directories.
pub const DEFAULT_INCIDENTS_DIR: &str = "incidents";

/// Settings for one capture run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Simulate capture: run nothing and write no log files.
    pub dry_run: bool,
    /// Per-command timeout in seconds. Must be non-zero.
    pub command_timeout_secs: u64,
    /// Parent directory for new incident directories.
    pub incidents_dir: PathBuf,
    /// Suppress console status lines.
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            incidents_dir: PathBuf::from(DEFAULT_INCIDENTS_DIR),
            quiet: false,
        }
    }
}

impl Config {
    /// Enable dry-run mode.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Reject settings that would make a run unbounded or unusable.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == 0 {
            return Err(DiagError::InvalidConfig(
                "command_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.incidents_dir.as_os_str().is_empty() {
            return Err(DiagError::InvalidConfig(
                "incidents_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

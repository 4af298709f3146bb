//! Incident directories and their audit records.
//!
//! Layout of one incident:
//!
//! ```text
//! <incidents_dir>/<incident_id>/
//!     incident.json     metadata + full command log, rewritten atomically
//!     audit.jsonl       one AuditEntry per captured module, appended atomically
//!     logs/<category>.log
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::atomic;
use crate::capability::Platform;
use crate::config::Config;
use crate::error::{DiagError, Result};

/// Version of the `incident.json` layout.
pub const SCHEMA_VERSION: u32 = 1;

pub const METADATA_FILE: &str = "incident.json";
pub const AUDIT_FILE: &str = "audit.jsonl";
pub const LOGS_DIR: &str = "logs";

/// Audit record for one capture module. One per module per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    /// Category identifier, e.g. `disk_free`.
    pub name: String,
    /// All commands of the module joined with `"; "`.
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// 0 when the module captured something, 1 otherwise.
    pub exit_code: i32,
    /// Byte length of the redacted output.
    pub output_len: usize,
    /// Hex SHA-256 of the persisted log file, if one was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_sha256: Option<String>,
}

impl CommandLog {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// One line of `audit.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub incident_id: String,
    pub module: String,
    pub exit_code: i32,
    pub output_len: usize,
    pub dry_run: bool,
}

impl AuditEntry {
    pub fn for_command(incident: &Incident, log: &CommandLog, dry_run: bool) -> Self {
        Self {
            timestamp: log.ended_at,
            incident_id: incident.id.clone(),
            module: log.name.clone(),
            exit_code: log.exit_code,
            output_len: log.output_len,
            dry_run,
        }
    }
}

/// A diagnostic-capture session and its on-disk working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub schema_version: u32,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub platform: Platform,
    /// Audit trail, in the order modules ran.
    pub commands: Vec<CommandLog>,
    #[serde(skip)]
    pub root: PathBuf,
    #[serde(skip)]
    pub logs_path: PathBuf,
}

impl Incident {
    /// Create a fresh incident directory (and its `logs/`) under `base_dir`.
    pub fn create(base_dir: &Path, platform: Platform) -> Result<Self> {
        let created_at = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("inc-{}-{}", created_at.format("%Y%m%dT%H%M%SZ"), &suffix[..8]);

        let root = base_dir.join(&id);
        let logs_path = root.join(LOGS_DIR);
        fs::create_dir_all(&logs_path)?;
        info!(incident_id = %id, path = %root.display(), "incident created");

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            id,
            created_at,
            platform,
            commands: Vec::new(),
            root,
            logs_path,
        })
    }

    /// Load an incident from its directory.
    pub fn load(root: &Path) -> Result<Self> {
        let metadata = root.join(METADATA_FILE);
        let bytes = fs::read(&metadata).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DiagError::IncidentNotFound(root.to_path_buf())
            } else {
                DiagError::Io(e)
            }
        })?;
        let mut incident: Incident = serde_json::from_slice(&bytes)?;
        incident.root = root.to_path_buf();
        incident.logs_path = root.join(LOGS_DIR);
        Ok(incident)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.root.join(AUDIT_FILE)
    }

    /// Path of the log file for a category name.
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.logs_path.join(format!("{name}.log"))
    }

    /// Append an entry to `audit.jsonl`.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        atomic::append(&self.audit_path(), line)?;
        Ok(())
    }

    /// Read back every entry of `audit.jsonl`. A missing file yields none.
    pub fn read_audit(&self) -> Result<Vec<AuditEntry>> {
        let content = match fs::read_to_string(self.audit_path()) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(DiagError::from))
            .collect()
    }
}

/// Persists incident metadata after a capture run.
///
/// Called once per run. Implementations must be idempotent.
pub trait IncidentRecorder: Send + Sync {
    fn update(&self, incident: &Incident, config: &Config) -> Result<()>;
}

/// Writes `incident.json` through [`atomic::write`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonIncidentRecorder;

impl JsonIncidentRecorder {
    fn write(incident: &Incident) -> Result<()> {
        let json = serde_json::to_vec_pretty(incident)?;
        atomic::write(&incident.metadata_path(), json)?;
        Ok(())
    }
}

impl IncidentRecorder for JsonIncidentRecorder {
    fn update(&self, incident: &Incident, config: &Config) -> Result<()> {
        Self::write(incident)?;
        info!(
            incident_id = %incident.id,
            commands = incident.commands.len(),
            dry_run = config.dry_run,
            "incident metadata updated"
        );
        Ok(())
    }
}

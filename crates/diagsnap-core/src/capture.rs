//! Capture orchestration.
//!
//! For every [`Category`] in declaration order the orchestrator resolves the
//! platform's commands, runs them one after another, redacts the combined
//! output, persists it atomically to `{logs_path}/{name}.log` and appends a
//! [`CommandLog`] to the incident. Nothing that goes wrong inside a module
//! stops the run; failures only show up in that module's [`CaptureResult`]
//! and `CommandLog::exit_code`.
//!
//! Output never reaches disk without passing through the [`Redactor`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn, Instrument};

use crate::atomic;
use crate::capability::{CapabilityTable, Category, Platform};
use crate::config::Config;
use crate::console;
use crate::exec::CommandRunner;
use crate::incident::{AuditEntry, CommandLog, Incident, IncidentRecorder};
use crate::obs;
use crate::redact::Redactor;

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// One capture category resolved for a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureModule {
    pub category: Category,
    pub name: &'static str,
    pub display_name: &'static str,
    pub commands: Vec<String>,
}

impl CaptureModule {
    pub fn resolve(category: Category, platform: Platform, table: &CapabilityTable) -> Self {
        Self {
            category,
            name: category.name(),
            display_name: category.display_name(),
            commands: table.commands_for(category, platform).to_vec(),
        }
    }

    /// Commands joined for the audit record.
    pub fn joined_commands(&self) -> String {
        self.commands.join("; ")
    }
}

/// Outcome of one module. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub name: String,
    /// At least one command succeeded (or would have, in dry-run).
    pub success: bool,
    /// Redacted output.
    pub output: String,
    pub error_msg: Option<String>,
    pub duration_ms: u64,
}

impl CaptureResult {
    /// Binary exit code recorded in the audit trail.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}

/// Runs every capture module against an incident.
pub struct CaptureOrchestrator {
    runner: Arc<dyn CommandRunner>,
    recorder: Arc<dyn IncidentRecorder>,
    table: CapabilityTable,
    redactor: Redactor,
}

impl CaptureOrchestrator {
    /// Orchestrator with the built-in capability table and redaction patterns.
    pub fn new(runner: Arc<dyn CommandRunner>, recorder: Arc<dyn IncidentRecorder>) -> Self {
        Self {
            runner,
            recorder,
            table: CapabilityTable::builtin(),
            redactor: Redactor::new(),
        }
    }

    pub fn with_table(mut self, table: CapabilityTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// The modules a run on `platform` would execute, in capture order.
    pub fn modules(&self, platform: Platform) -> Vec<CaptureModule> {
        Category::ALL
            .iter()
            .map(|c| CaptureModule::resolve(*c, platform, &self.table))
            .collect()
    }

    /// Capture every module into `incident`, then update its metadata once.
    ///
    /// Never fails. Per-module results are returned for reporting only.
    pub async fn run(&self, incident: &mut Incident, config: &Config) -> Vec<CaptureResult> {
        let span = obs::capture_span(&incident.id);
        self.run_modules(incident, config).instrument(span).await
    }

    async fn run_modules(&self, incident: &mut Incident, config: &Config) -> Vec<CaptureResult> {
        let run_start = Instant::now();
        obs::emit_capture_started(&incident.id, incident.platform.as_str(), config.dry_run);

        let modules = self.modules(incident.platform);
        let mut results = Vec::with_capacity(modules.len());

        for module in &modules {
            let (result, log) = self.capture_module(module, incident, config).await;

            let entry = AuditEntry::for_command(incident, &log, config.dry_run);
            if let Err(e) = incident.append_audit(&entry) {
                warn!(module = module.name, error = %e, "failed to append audit entry");
            }
            incident.commands.push(log);

            obs::emit_module_finished(
                module.name,
                result.success,
                result.duration_ms,
                result.output.len(),
            );
            if !config.quiet {
                println!("{}", console::status_line(module.display_name, &result));
            }
            results.push(result);
        }

        if let Err(e) = self.recorder.update(incident, config) {
            warn!(incident_id = %incident.id, error = %e, "failed to update incident metadata");
        }

        let captured = results.iter().filter(|r| r.success).count();
        obs::emit_capture_finished(
            &incident.id,
            captured,
            results.len() - captured,
            millis(run_start.elapsed()),
        );
        results
    }

    async fn capture_module(
        &self,
        module: &CaptureModule,
        incident: &Incident,
        config: &Config,
    ) -> (CaptureResult, CommandLog) {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut raw = String::new();
        let mut success = false;
        let mut failures = Vec::new();

        for command in &module.commands {
            if config.dry_run {
                raw.push_str(&format!("[dry-run] would execute: {command}\n"));
                success = true;
                continue;
            }

            let outcome = self.runner.run(command).await;
            if outcome.success() {
                raw.push_str(&format!("=== {command} ===\n{}\n", outcome.output));
                success = true;
            } else {
                debug!(module = module.name, command = %command, exit_code = outcome.exit_code, "command failed");
                failures.push(format!("`{command}` exited {}", outcome.exit_code));
            }
        }

        let output = self.redactor.redact(&raw);

        let mut error_msg = if success {
            None
        } else if module.commands.is_empty() {
            Some(format!("no commands available on {}", incident.platform))
        } else {
            Some(format!("all commands failed: {}", failures.join(", ")))
        };

        let mut log_sha256 = None;
        if !output.is_empty() && !config.dry_run {
            match atomic::write(&incident.log_path(module.name), &output) {
                Ok(()) => log_sha256 = Some(hex::encode(Sha256::digest(output.as_bytes()))),
                Err(e) => {
                    obs::emit_module_persist_error(module.name, &e);
                    error_msg = Some(format!("failed to persist log: {e}"));
                }
            }
        }

        let result = CaptureResult {
            name: module.name.to_string(),
            success,
            error_msg,
            duration_ms: millis(start.elapsed()),
            output,
        };

        let log = CommandLog {
            name: module.name.to_string(),
            command: module.joined_commands(),
            started_at,
            ended_at: Utc::now(),
            exit_code: result.exit_code(),
            output_len: result.output.len(),
            log_sha256,
        };

        (result, log)
    }
}

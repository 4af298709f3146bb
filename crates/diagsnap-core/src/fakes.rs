//! In-memory fakes for the orchestrator's collaborators (testing only)
//!
//! Provides `ScriptedRunner` and `RecordingRecorder`, which satisfy the
//! `CommandRunner` and `IncidentRecorder` contracts without touching the OS.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{DiagError, Result};
use crate::exec::{CommandOutcome, CommandRunner};
use crate::incident::{Incident, IncidentRecorder};

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

/// Command runner that answers from a script and records every call.
#[derive(Debug)]
pub struct ScriptedRunner {
    default: CommandOutcome,
    scripted: HashMap<String, CommandOutcome>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Every command exits 0 with `output`.
    pub fn succeeding(output: &str) -> Self {
        Self::with_default(CommandOutcome {
            exit_code: 0,
            output: output.to_string(),
        })
    }

    /// Every command exits with `exit_code` and no output.
    pub fn failing(exit_code: i32) -> Self {
        Self::with_default(CommandOutcome {
            exit_code,
            output: String::new(),
        })
    }

    fn with_default(default: CommandOutcome) -> Self {
        Self {
            default,
            scripted: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `command` exit with `exit_code`.
    pub fn fail_on(mut self, command: &str, exit_code: i32) -> Self {
        self.scripted.insert(
            command.to_string(),
            CommandOutcome {
                exit_code,
                output: String::new(),
            },
        );
        self
    }

    /// Make `command` succeed with `output`.
    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.scripted.insert(
            command.to_string(),
            CommandOutcome {
                exit_code: 0,
                output: output.to_string(),
            },
        );
        self
    }

    /// Commands received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> CommandOutcome {
        self.calls.lock().unwrap().push(command.to_string());
        self.scripted
            .get(command)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingRecorder
// ---------------------------------------------------------------------------

/// Incident recorder that remembers each update instead of writing it.
#[derive(Debug, Default)]
pub struct RecordingRecorder {
    snapshots: Mutex<Vec<Incident>>,
    fail: bool,
}

impl RecordingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose every update fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn update_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    /// The incident as it was at the most recent update.
    pub fn last_snapshot(&self) -> Option<Incident> {
        self.snapshots.lock().unwrap().last().cloned()
    }
}

impl IncidentRecorder for RecordingRecorder {
    fn update(&self, incident: &Incident, _config: &Config) -> Result<()> {
        self.snapshots.lock().unwrap().push(incident.clone());
        if self.fail {
            return Err(DiagError::IncidentNotFound(incident.root.clone()));
        }
        Ok(())
    }
}

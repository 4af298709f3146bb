//! diagsnap Core Library
//!
//! Best-effort diagnostic capture: run read-only inspection commands, redact
//! credentials and PII from their output, and persist the result atomically
//! into a per-incident directory with an audit trail.

pub mod atomic;
pub mod capability;
pub mod capture;
pub mod config;
pub mod console;
pub mod error;
pub mod exec;
pub mod fakes;
pub mod incident;
pub mod obs;
pub mod redact;
pub mod telemetry;

pub use capability::{commands_for, CapabilityTable, Category, Platform};
pub use capture::{CaptureModule, CaptureOrchestrator, CaptureResult};
pub use config::Config;
pub use error::{DiagError, PersistError, PersistResult, Result};
pub use exec::{CommandOutcome, CommandRunner, ShellRunner};
pub use incident::{AuditEntry, CommandLog, Incident, IncidentRecorder, JsonIncidentRecorder};
pub use obs::{capture_span, emit_capture_finished, emit_capture_started, emit_module_finished};
pub use redact::{redact, RedactionReport, Redactor, SENTINEL};
pub use telemetry::init_tracing;

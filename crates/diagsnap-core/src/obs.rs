//! Structured observability hooks for capture runs.
//!
//! This module provides:
//! - Incident-scoped tracing spans via [`capture_span`]
//! - Emission functions for capture start, per-module completion and run finish
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG` or `DIAGSNAP_LOG`).

use tracing::info;

/// Incident-scoped span for a capture run.
///
/// Attach it with `tracing::Instrument` so it survives `.await` points.
///
/// # Example
///
/// ```ignore
/// run_capture().instrument(capture_span("inc-20240101T000000Z-1a2b3c4d")).await;
/// // every tracing call inside carries incident_id
/// ```
pub fn capture_span(incident_id: &str) -> tracing::Span {
    tracing::info_span!("diagsnap.capture", incident_id = %incident_id)
}

/// Emit event: capture started on a platform.
pub fn emit_capture_started(incident_id: &str, platform: &str, dry_run: bool) {
    info!(
        event = "capture.started",
        incident_id = %incident_id,
        platform = %platform,
        dry_run = dry_run,
    );
}

/// Emit event: one module finished.
pub fn emit_module_finished(module: &str, success: bool, duration_ms: u64, output_len: usize) {
    info!(
        event = "capture.module_finished",
        module = %module,
        success = success,
        duration_ms = duration_ms,
        output_len = output_len,
    );
}

/// Emit event: module log could not be persisted (warning level).
pub fn emit_module_persist_error(module: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "capture.persist_error", module = %module, error = %error);
}

/// Emit event: capture finished.
pub fn emit_capture_finished(incident_id: &str, captured: usize, skipped: usize, duration_ms: u64) {
    info!(
        event = "capture.finished",
        incident_id = %incident_id,
        captured = captured,
        skipped = skipped,
        duration_ms = duration_ms,
    );
}

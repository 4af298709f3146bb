//! End-to-end capture runs against scripted and real command runners.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use diagsnap_core::fakes::{RecordingRecorder, ScriptedRunner};
use diagsnap_core::{
    CapabilityTable, CaptureOrchestrator, Category, Config, Incident, JsonIncidentRecorder,
    Platform,
};

fn quiet() -> Config {
    Config {
        quiet: true,
        ..Config::default()
    }
}

fn log_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".log"))
        .collect();
    names.sort();
    names
}

/// Test: all six categories captured, every log email-free, commands in order
#[tokio::test]
async fn test_full_capture_produces_six_redacted_logs() {
    let dir = tempfile::tempdir().unwrap();
    let mut incident = Incident::create(dir.path(), Platform::Linux).unwrap();
    let runner = Arc::new(ScriptedRunner::succeeding(
        "contact admin@corp.example.com for access\n",
    ));
    let recorder = Arc::new(RecordingRecorder::new());
    let orch = CaptureOrchestrator::new(runner, recorder.clone());

    let results = orch.run(&mut incident, &quiet()).await;

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(log_files(&incident.logs_path).len(), 6);

    for category in Category::ALL {
        let content = fs::read_to_string(incident.log_path(category.name())).unwrap();
        assert!(!content.contains("admin@corp.example.com"), "{category} leaked email");
        assert!(content.contains("[REDACTED]"));
    }

    let names: Vec<_> = incident.commands.iter().map(|c| c.name.as_str()).collect();
    let expected: Vec<_> = Category::ALL.iter().map(Category::name).collect();
    assert_eq!(names, expected);

    assert_eq!(recorder.update_count(), 1, "metadata updated exactly once");
    assert_eq!(recorder.last_snapshot().unwrap().commands.len(), 6);
}

/// Test: a module whose every command fails still gets exactly one audit record
#[tokio::test]
async fn test_all_commands_failing_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut incident = Incident::create(dir.path(), Platform::Linux).unwrap();
    let runner = Arc::new(ScriptedRunner::failing(2));
    let orch = CaptureOrchestrator::new(runner, Arc::new(RecordingRecorder::new()));

    let results = orch.run(&mut incident, &quiet()).await;

    assert_eq!(incident.commands.len(), 6);
    for (result, log) in results.iter().zip(&incident.commands) {
        assert!(!result.success);
        assert!(result.error_msg.as_deref().unwrap().starts_with("all commands failed"));
        assert_eq!(log.exit_code, 1);
        assert_eq!(log.output_len, 0);
    }
    assert!(log_files(&incident.logs_path).is_empty());
}

/// Test: dry-run executes nothing and writes no logs, but still audits every module
#[tokio::test]
async fn test_dry_run_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut incident = Incident::create(dir.path(), Platform::Linux).unwrap();
    let runner = Arc::new(ScriptedRunner::succeeding("should never appear"));
    let orch = CaptureOrchestrator::new(runner.clone(), Arc::new(RecordingRecorder::new()));

    let config = quiet().dry_run();
    let results = orch.run(&mut incident, &config).await;

    assert!(runner.calls().is_empty(), "no command may run in dry-run");
    assert!(log_files(&incident.logs_path).is_empty());
    assert_eq!(incident.commands.len(), 6);
    assert!(results.iter().all(|r| r.success));
    assert!(results[0].output.contains("[dry-run] would execute: uname -a"));
    assert!(incident.commands.iter().all(|c| c.log_sha256.is_none()));
}

/// Test: commands run strictly in category then list order
#[tokio::test]
async fn test_commands_run_in_declared_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut incident = Incident::create(dir.path(), Platform::MacOs).unwrap();
    let runner = Arc::new(ScriptedRunner::succeeding("ok\n"));
    let orch = CaptureOrchestrator::new(runner.clone(), Arc::new(RecordingRecorder::new()));

    orch.run(&mut incident, &quiet()).await;

    let expected: Vec<String> = Category::ALL
        .iter()
        .flat_map(|c| diagsnap_core::commands_for(*c, Platform::MacOs).iter().cloned())
        .collect();
    assert_eq!(runner.calls(), expected);
}

/// Test: metadata failure is logged, not raised, and the audit file still exists
#[tokio::test]
async fn test_metadata_failure_does_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    let mut incident = Incident::create(dir.path(), Platform::Linux).unwrap();
    let recorder = Arc::new(RecordingRecorder::failing());
    let orch = CaptureOrchestrator::new(
        Arc::new(ScriptedRunner::succeeding("fine\n")),
        recorder.clone(),
    );

    let results = orch.run(&mut incident, &quiet()).await;

    assert_eq!(results.len(), 6);
    assert_eq!(recorder.update_count(), 1);
    let audit = incident.read_audit().unwrap();
    assert_eq!(audit.len(), 6);
    assert!(audit.iter().all(|e| e.incident_id == incident.id && !e.dry_run));
}

/// Test: the JSON recorder persists the full command log in one file
#[tokio::test]
async fn test_json_recorder_persists_command_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut incident = Incident::create(dir.path(), Platform::Windows).unwrap();
    let orch = CaptureOrchestrator::new(
        Arc::new(ScriptedRunner::succeeding("C:\\> ok\n").fail_on("ipconfig", 1)),
        Arc::new(JsonIncidentRecorder),
    );

    orch.run(&mut incident, &quiet()).await;

    let loaded = Incident::load(&incident.root).unwrap();
    assert_eq!(loaded.commands, incident.commands);
    let network = loaded
        .commands
        .iter()
        .find(|c| c.name == "network_summary")
        .unwrap();
    assert_eq!(network.exit_code, 1);
}

/// Test: real shell commands, through a custom read-only table
#[cfg(unix)]
#[tokio::test]
async fn test_shell_runner_end_to_end() {
    use std::time::Duration;

    use diagsnap_core::ShellRunner;

    let dir = tempfile::tempdir().unwrap();
    let mut incident = Incident::create(dir.path(), Platform::Other).unwrap();
    let table = CapabilityTable::builtin()
        .with_commands(Category::OsVersion, Platform::Other, ["echo kernel-x"])
        .with_commands(Category::Uptime, Platform::Other, ["echo password=hunter2"])
        .with_commands(Category::DiskFree, Platform::Other, ["false", "echo disk-ok"])
        .with_commands(Category::Memory, Platform::Other, ["exit 1"])
        .with_commands(Category::NetworkSummary, Platform::Other, Vec::<String>::new())
        .with_commands(Category::ProcessSummary, Platform::Other, ["sleep 5"]);
    let orch = CaptureOrchestrator::new(
        Arc::new(ShellRunner::new(Duration::from_millis(500))),
        Arc::new(JsonIncidentRecorder),
    )
    .with_table(table);

    let results = orch.run(&mut incident, &quiet()).await;
    let success: Vec<bool> = results.iter().map(|r| r.success).collect();
    assert_eq!(success, vec![true, true, true, false, false, false]);

    let uptime = fs::read_to_string(incident.log_path("uptime")).unwrap();
    assert!(!uptime.contains("hunter2"));
    let disk = fs::read_to_string(incident.log_path("disk_free")).unwrap();
    assert_eq!(disk, "=== echo disk-ok ===\ndisk-ok\n\n");
    assert!(incident.metadata_path().exists());
}

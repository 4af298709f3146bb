//! External command execution.
//!
//! The orchestrator only sees [`CommandRunner`]. Spawn errors and timeouts
//! are folded into a non-zero exit code so callers have a single failure path.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Exit code reported when the command could not run or was killed.
pub const EXECUTION_FAULT: i32 = -1;

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    /// Captured stdout, followed by stderr when it is non-empty.
    pub output: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn fault(message: String) -> Self {
        Self {
            exit_code: EXECUTION_FAULT,
            output: message,
        }
    }
}

/// Runs a shell command string to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandOutcome;
}

/// Runs commands through the platform shell with a per-command timeout.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[cfg(windows)]
    fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("cmd");
        // cmd.exe parses its own command line; `arg` would escape the inner quotes.
        cmd.arg("/C").raw_arg(command);
        Self::with_stdio(cmd)
    }

    #[cfg(not(windows))]
    fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        Self::with_stdio(cmd)
    }

    fn with_stdio(mut cmd: Command) -> Command {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::config::DEFAULT_COMMAND_TIMEOUT_SECS))
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> CommandOutcome {
        let child = match Self::shell_command(command).spawn() {
            Ok(child) => child,
            Err(e) => return CommandOutcome::fault(format!("failed to spawn: {e}")),
        };

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return CommandOutcome::fault(format!("failed to wait: {e}")),
            Err(_) => {
                return CommandOutcome::fault(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                ))
            }
        };

        let exit_code = output.status.code().unwrap_or(EXECUTION_FAULT);
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        debug!(command = %command, exit_code, bytes = text.len(), "command finished");

        CommandOutcome {
            exit_code,
            output: text,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner() -> ShellRunner {
        ShellRunner::new(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn successful_command_captures_stdout() {
        let outcome = runner().run("echo hello").await;
        assert!(outcome.success());
        assert_eq!(outcome.output, "hello\n");
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        let outcome = runner().run("exit 3").await;
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, 3);
    }

    #[tokio::test]
    async fn stderr_is_appended() {
        let outcome = runner().run("echo out; echo err 1>&2").await;
        assert_eq!(outcome.output, "out\nerr\n");
    }

    #[tokio::test]
    async fn pipelines_run_through_the_shell() {
        let outcome = runner().run("printf 'a\\nb\\nc\\n' | head -n 2").await;
        assert_eq!(outcome.output, "a\nb\n");
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let outcome = ShellRunner::new(Duration::from_millis(200))
            .run("sleep 5")
            .await;
        assert_eq!(outcome.exit_code, EXECUTION_FAULT);
        assert!(outcome.output.contains("timed out"));
    }
}

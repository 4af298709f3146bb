//! diagsnap - redacting diagnostic capture
//!
//! ## Commands
//!
//! - `capture`: run every capture module into a new incident directory
//! - `redact`: redact a file or stdin to stdout
//! - `commands`: print the capability table for a platform
//! - `show`: print the command log of an existing incident

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use diagsnap_core::{
    CaptureOrchestrator, Category, Config, Incident, JsonIncidentRecorder, Platform, Redactor,
    ShellRunner,
};

#[derive(Parser)]
#[command(name = "diagsnap")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Best-effort, redacting diagnostic capture", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture diagnostics into a new incident directory
    Capture {
        /// Show what would run without executing anything or writing logs
        #[arg(long, env = "DIAGSNAP_DRY_RUN")]
        dry_run: bool,

        /// Parent directory for incident directories
        #[arg(long, env = "DIAGSNAP_INCIDENTS_DIR", default_value = diagsnap_core::config::DEFAULT_INCIDENTS_DIR)]
        incidents_dir: PathBuf,

        /// Per-command timeout in seconds
        #[arg(long, env = "DIAGSNAP_TIMEOUT_SECS", default_value_t = diagsnap_core::config::DEFAULT_COMMAND_TIMEOUT_SECS)]
        timeout: u64,

        /// Suppress per-module status lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Redact a file (or stdin) and write the result to stdout
    Redact {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },

    /// Print the commands each category resolves to
    Commands {
        /// Platform to resolve for (default: this host)
        #[arg(long)]
        platform: Option<Platform>,
    },

    /// Show the command log of an incident
    Show {
        /// Incident directory
        incident: PathBuf,

        /// Print incident.json as-is
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    diagsnap_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Capture {
            dry_run,
            incidents_dir,
            timeout,
            quiet,
        } => {
            let config = Config {
                dry_run,
                command_timeout_secs: timeout,
                incidents_dir,
                quiet,
            };
            cmd_capture(&config).await
        }
        Commands::Redact { file } => cmd_redact(file),
        Commands::Commands { platform } => cmd_commands(platform.unwrap_or_else(Platform::current)),
        Commands::Show { incident, raw } => cmd_show(&incident, raw),
    }
}

async fn cmd_capture(config: &Config) -> Result<()> {
    config.validate()?;

    std::fs::create_dir_all(&config.incidents_dir)
        .with_context(|| format!("Failed to create {:?}", config.incidents_dir))?;
    let mut incident = Incident::create(&config.incidents_dir, Platform::current())
        .context("Failed to create incident directory")?;
    info!(incident_id = %incident.id, "starting capture");

    if !config.quiet {
        let mode = if config.dry_run { " (dry run)" } else { "" };
        println!("Capturing diagnostics for {}{}", incident.id, mode);
    }

    let orchestrator = CaptureOrchestrator::new(
        Arc::new(ShellRunner::new(config.command_timeout())),
        Arc::new(JsonIncidentRecorder),
    );
    let results = orchestrator.run(&mut incident, config).await;

    let captured = results.iter().filter(|r| r.success).count();
    println!(
        "{}/{} modules captured -> {}",
        captured,
        results.len(),
        incident.root.display()
    );
    Ok(())
}

fn cmd_redact(file: Option<PathBuf>) -> Result<()> {
    let input = match &file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let report = Redactor::new().redact_with_report(&input);
    print!("{}", report.text);
    eprintln!(
        "{} redaction(s) applied{}",
        report.redactions_applied,
        if report.patterns_matched.is_empty() {
            String::new()
        } else {
            format!(" [{}]", report.patterns_matched.join(", "))
        }
    );
    Ok(())
}

fn cmd_commands(platform: Platform) -> Result<()> {
    println!("Platform: {}", platform);
    for category in Category::ALL {
        let commands = diagsnap_core::commands_for(category, platform);
        println!("\n{} ({})", category.display_name(), category.name());
        if commands.is_empty() {
            println!("  (skipped on this platform)");
        }
        for command in commands {
            println!("  {}", command);
        }
    }
    Ok(())
}

fn cmd_show(root: &Path, raw: bool) -> Result<()> {
    let incident =
        Incident::load(root).with_context(|| format!("Failed to load incident at {:?}", root))?;

    if raw {
        println!("{}", serde_json::to_string_pretty(&incident)?);
        return Ok(());
    }

    println!("Incident: {}", incident.id);
    println!("Created:  {}", incident.created_at.to_rfc3339());
    println!("Platform: {}", incident.platform);
    println!();
    println!(
        "{:<18} {:>4} {:>8} {:>9}  {}",
        "MODULE", "EXIT", "BYTES", "MILLIS", "COMMAND"
    );
    for log in &incident.commands {
        let millis = (log.ended_at - log.started_at).num_milliseconds();
        println!(
            "{:<18} {:>4} {:>8} {:>9}  {}",
            log.name, log.exit_code, log.output_len, millis, log.command
        );
    }
    Ok(())
}

//! tierlimit - tiered admission limiter
//!
//! CLI entry point for exercising a limiter with synthetic workloads.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use tierlimit::cli::{Cli, Command, OutputFormat, WorkloadArgs};
use tierlimit::config::Config;
use tierlimit::limiter::TieredLimiter;
use tierlimit::workload::{self, TaskOutcome, TaskReport};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tierlimit")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("tierlimit.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run { workload, format } => cmd_run(&config, &workload, format).await,
        Command::Snapshot { workload, after_ms } => cmd_snapshot(&config, &workload, after_ms).await,
        Command::Config => cmd_config(&config),
    }
}

fn build_limiter(config: &Config) -> Result<TieredLimiter> {
    config.validate()?;
    Ok(TieredLimiter::new(config.limiter.clone())?)
}

async fn cmd_run(config: &Config, args: &WorkloadArgs, format: OutputFormat) -> Result<()> {
    debug!(?args, ?format, "cmd_run: called");
    let simulation = args.apply(config.simulation.clone());
    simulation.validate()?;
    let limiter = build_limiter(config)?;

    let tasks = workload::plan(&simulation);
    info!(tasks = tasks.len(), "cmd_run: submitting workload");
    let reports = workload::run(&limiter, &tasks).await;
    let stats = limiter.stats();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "config": config.limiter,
                "tasks": reports,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for report in &reports {
                print_report(report);
            }
            println!();
            println!(
                "{} {} admitted ({} sustained, {} burst), peak running {}",
                "✓".green(),
                stats.total_admitted,
                stats.admitted_sustained,
                stats.admitted_burst,
                stats.peak_running
            );
        }
    }
    Ok(())
}

fn print_report(report: &TaskReport) {
    let started = report
        .started_ms
        .map(|ms| format!("+{}ms", ms))
        .unwrap_or_else(|| "-".to_string());
    let finished = report
        .finished_ms
        .map(|ms| format!("+{}ms", ms))
        .unwrap_or_else(|| "-".to_string());
    let outcome = match &report.outcome {
        TaskOutcome::Succeeded => "ok".green(),
        TaskOutcome::Failed(reason) => format!("failed: {}", reason).red(),
        TaskOutcome::Abandoned => "abandoned".yellow(),
    };
    println!(
        "{:>4} {:>10} -> {:>10}  {}",
        format!("#{}", report.index).cyan(),
        started,
        finished,
        outcome
    );
}

async fn cmd_snapshot(config: &Config, args: &WorkloadArgs, after_ms: u64) -> Result<()> {
    debug!(?args, after_ms, "cmd_snapshot: called");
    let simulation = args.apply(config.simulation.clone());
    simulation.validate()?;
    let limiter = build_limiter(config)?;

    let tasks = workload::plan(&simulation);
    let submission = workload::submit(&limiter, &tasks);

    if after_ms > 0 {
        tokio::time::sleep(Duration::from_millis(after_ms)).await;
    }

    let snapshot = limiter.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    let reports = submission.collect().await;
    debug!(count = reports.len(), "cmd_snapshot: workload settled");
    limiter.wait_idle().await;
    info!(stats = ?limiter.stats(), "cmd_snapshot: drained");
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", config.to_yaml()?);
    Ok(())
}

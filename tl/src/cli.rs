//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tierlimit - tiered admission limiter
#[derive(Parser, Debug)]
#[command(name = "tl", author, version, about = "Pace async work through sustained and burst tiers", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Drive a synthetic workload through the limiter and report admissions
    Run {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Submit a workload, print a snapshot of queued and running work, then drain
    Snapshot {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Milliseconds to wait after submitting before taking the snapshot
        #[arg(short, long, default_value = "0")]
        after_ms: u64,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Overrides for the configured simulation
#[derive(Debug, Clone, Default, clap::Args)]
pub struct WorkloadArgs {
    /// Number of tasks to submit
    #[arg(short = 'n', long)]
    pub tasks: Option<usize>,

    /// Shortest task duration in milliseconds
    #[arg(long)]
    pub min_ms: Option<u64>,

    /// Longest task duration in milliseconds
    #[arg(long)]
    pub max_ms: Option<u64>,

    /// Probability that a task fails (0.0 - 1.0)
    #[arg(long)]
    pub fail_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl WorkloadArgs {
    /// Apply the overrides on top of configured simulation settings
    pub fn apply(&self, mut config: crate::config::SimulationConfig) -> crate::config::SimulationConfig {
        if let Some(tasks) = self.tasks {
            config.tasks = tasks;
        }
        if let Some(min_ms) = self.min_ms {
            config.min_ms = min_ms;
        }
        if let Some(max_ms) = self.max_ms {
            config.max_ms = max_ms;
        }
        if let Some(fail_rate) = self.fail_rate {
            config.fail_rate = fail_rate;
        }
        config
    }
}

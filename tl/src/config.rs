//! tierlimit configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::limiter::LimiterConfig;

const LOCAL_CONFIG: &str = ".tierlimit.yml";

/// Main tierlimit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Limiter tiers
    pub limiter: LimiterConfig,

    /// Synthetic workload defaults for `tl run`
    pub simulation: SimulationConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.limiter.validate().context("Invalid limiter configuration")?;
        self.simulation.validate()
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Otherwise the first file found among
    /// [`Config::search_paths`] is used, and only when none exists do the
    /// built-in defaults apply. A file that exists but does not parse is an
    /// error, never a silent fallback.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path).context(format!("Failed to load config from {}", path.display())),
            None => Self::load_first(&Self::search_paths()),
        }
    }

    /// Discovery order: `./.tierlimit.yml`, then `~/.config/tierlimit/tierlimit.yml`
    pub fn search_paths() -> Vec<PathBuf> {
        std::iter::once(PathBuf::from(LOCAL_CONFIG))
            .chain(dirs::config_dir().map(|dir| dir.join("tierlimit").join("tierlimit.yml")))
            .collect()
    }

    fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::load_from_file(path).context(format!("Failed to load config from {}", path.display())),
            None => {
                tracing::info!(searched = ?candidates, "No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed here; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::search_paths(),
        };

        candidates
            .into_iter()
            .find(|path| path.exists())
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

/// Synthetic workload defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of tasks to submit
    pub tasks: usize,

    /// Shortest task duration in milliseconds
    #[serde(rename = "min-ms")]
    pub min_ms: u64,

    /// Longest task duration in milliseconds
    #[serde(rename = "max-ms")]
    pub max_ms: u64,

    /// Probability that a task fails, 0.0 to 1.0
    #[serde(rename = "fail-rate")]
    pub fail_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tasks: 12,
            min_ms: 50,
            max_ms: 500,
            fail_rate: 0.1,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(eyre::eyre!(
                "simulation min-ms ({}) is greater than max-ms ({})",
                self.min_ms,
                self.max_ms
            ));
        }
        if !(0.0..=1.0).contains(&self.fail_rate) {
            return Err(eyre::eyre!("simulation fail-rate must be between 0.0 and 1.0, got {}", self.fail_rate));
        }
        Ok(())
    }
}

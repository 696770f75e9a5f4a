//! Limiter configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::LimiterError;
use super::tier::TierKind;

/// Quota and refresh window for a single tier
///
/// Both fields are required when a tier section is written out in YAML, so a
/// burst section with only one of them fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    /// Max tasks running at once in this tier
    pub quota: usize,

    /// Refresh window in milliseconds
    #[serde(rename = "refresh-ms")]
    pub refresh_ms: u64,
}

impl TierConfig {
    pub fn new(quota: usize, refresh_ms: u64) -> Self {
        Self { quota, refresh_ms }
    }

    /// Get the refresh window as a Duration
    pub fn refresh_window(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

/// Configuration for a [`TieredLimiter`](super::TieredLimiter)
///
/// The default carries both tiers, but a written-out section only gets a
/// burst tier if it names one: leaving `burst` out disables it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Tier that always gets first refusal on free capacity
    pub sustained: TierConfig,

    /// Overflow tier, consulted only while the sustained tier is full
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst: Option<TierConfig>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            sustained: TierConfig::new(2, 1000),
            burst: Some(TierConfig::new(8, 10_000)),
        }
    }
}

impl LimiterConfig {
    /// A limiter with only the sustained tier
    pub fn single_tier(quota: usize, refresh_ms: u64) -> Self {
        Self {
            sustained: TierConfig::new(quota, refresh_ms),
            burst: None,
        }
    }

    /// Builder-style: add (or replace) the burst tier
    pub fn with_burst(mut self, quota: usize, refresh_ms: u64) -> Self {
        self.burst = Some(TierConfig::new(quota, refresh_ms));
        self
    }

    /// Builder-style: drop the burst tier
    pub fn without_burst(mut self) -> Self {
        self.burst = None;
        self
    }

    /// Tiers in priority order
    pub fn tiers(&self) -> Vec<(TierKind, TierConfig)> {
        std::iter::once((TierKind::Sustained, self.sustained))
            .chain(self.burst.map(|burst| (TierKind::Burst, burst)))
            .collect()
    }

    /// Combined quota across all tiers
    pub fn total_quota(&self) -> usize {
        self.tiers().iter().map(|(_, tier)| tier.quota).sum()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LimiterError> {
        for (tier, config) in self.tiers() {
            if config.quota == 0 {
                return Err(LimiterError::ZeroQuota { tier });
            }
        }
        Ok(())
    }
}

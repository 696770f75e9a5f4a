//! tierlimit - tiered admission limiter
//!
//! Keeps a client from overwhelming a rate-limited remote service while still
//! allowing short bursts of extra throughput. Work is submitted to a
//! [`TieredLimiter`], which admits it strictly in submission order into a
//! sustained tier or, once that is full, an optional burst tier.
//!
//! # Core Concepts
//!
//! - **Quota**: each tier bounds how many tasks run at once
//! - **Refresh Window**: after a task settles, its tier waits out the rest of
//!   the current window before admitting again
//! - **Identity**: every submission gets its own [`TaskId`], so identical
//!   operations never get confused with each other
//!
//! # Example
//!
//! ```no_run
//! use tierlimit::{LimiterConfig, TieredLimiter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = TieredLimiter::new(LimiterConfig::single_tier(2, 1000).with_burst(2, 500))?;
//! let handle = limiter.submit(|| async { Ok::<_, std::io::Error>(42) });
//! assert_eq!(handle.await?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`limiter`] - the limiter, its tiers, and task handles
//! - [`workload`] - synthetic workloads for exercising a limiter
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod limiter;
pub mod workload;

// Re-export commonly used types
pub use config::{Config, SimulationConfig};
pub use limiter::{
    LimiterConfig, LimiterError, LimiterSnapshot, LimiterStats, TaskError, TaskHandle, TaskId, TaskInfo, TierConfig,
    TierKind, TierSnapshot, TieredLimiter,
};

//! Tiered admission limiter
//!
//! Bounds how many async operations run at once and how quickly new ones
//! start, across a sustained tier and an optional burst tier, in a single
//! component.

mod config;
mod core;
mod error;
mod handle;
mod queue;
mod tier;

pub use config::{LimiterConfig, TierConfig};
pub use core::TieredLimiter;
pub use error::{LimiterError, TaskError};
pub use handle::TaskHandle;
pub use queue::{LimiterSnapshot, LimiterStats, TaskId, TaskInfo, TierSnapshot};
pub use tier::TierKind;

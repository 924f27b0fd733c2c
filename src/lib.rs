//! CScan-RS: asset discovery over cyberspace search engines
//!
//! Fans IP and domain targets out over Hunter, FOFA and Quake, and collects
//! company assets from 0.zone, pacing every backend with its own adaptive
//! rate limiter.

pub mod cli;
pub mod config;
pub mod engines;
pub mod error;
pub mod input;
pub mod metrics;
pub mod network;
pub mod output;
pub mod query;
pub mod ratelimit;
pub mod results;
pub mod search;

use std::time::Duration;

pub use config::Settings;
pub use engines::{Backend, CompanyBackend, Engine};
pub use error::{BatchError, Cancelled, EngineError};
pub use results::{Asset, AssetKind, ResultContainer, Target};
pub use search::{BatchOutcome, CompanyResults, CompanySearch, Search};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Interval between two requests to one backend unless configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound of a backoff wait
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(60);

//! Asset types, the concurrent result accumulator and deduplication
//!
//! This module defines the normalized records every backend produces.

mod container;
pub mod dedup;
mod types;

pub use container::ResultContainer;
pub use dedup::deduplicate;
pub use types::*;

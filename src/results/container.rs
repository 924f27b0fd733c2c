//! Shared accumulator for assets collected by concurrent target pipelines

use super::types::Asset;
use crate::error::BatchFailure;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Fan-in point for per-target tasks.
///
/// Clones share the same storage. Each append takes the lock once and
/// never holds it across an await point.
#[derive(Debug, Clone, Default)]
pub struct ResultContainer {
    assets: Arc<Mutex<Vec<Asset>>>,
    failures: Arc<Mutex<Vec<BatchFailure>>>,
}

impl ResultContainer {
    /// Create a new empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Append all assets produced by one target
    pub fn extend_assets(&self, assets: Vec<Asset>) {
        if assets.is_empty() {
            return;
        }
        lock(&self.assets).extend(assets);
    }

    /// Record a target for which every attempted backend failed
    pub fn add_failure(&self, failure: BatchFailure) {
        lock(&self.failures).push(failure);
    }

    /// Number of assets collected so far
    pub fn asset_count(&self) -> usize {
        lock(&self.assets).len()
    }

    /// Take everything collected so far, leaving the container empty
    pub fn drain(&self) -> (Vec<Asset>, Vec<BatchFailure>) {
        let assets = std::mem::take(&mut *lock(&self.assets));
        let failures = std::mem::take(&mut *lock(&self.failures));
        (assets, failures)
    }
}

/// A panicking task cannot leave a half-written `Vec`, so a poisoned lock
/// still guards consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

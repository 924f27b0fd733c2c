//! Per-backend adaptive rate limiting
//!
//! Every backend gets its own [`RateLimiter`]. Limiters are owned by the
//! orchestrator that created them through a [`RateLimiters`] registry; no
//! limiter state is process-global.

mod classifier;
mod limiter;

pub use classifier::{ErrorClass, ErrorClassifier};
pub use limiter::{BackoffPolicy, RateLimiter, RateLimiterState};

use crate::error::Cancelled;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Limiters keyed by backend name
#[derive(Debug, Default)]
pub struct RateLimiters {
    limiters: HashMap<String, Arc<RateLimiter>>,
    policy: BackoffPolicy,
}

impl RateLimiters {
    /// Create an empty registry using `policy` for limiters it creates itself
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            limiters: HashMap::new(),
            policy,
        }
    }

    /// Register a limiter, replacing any previous one with the same name
    pub fn insert(&mut self, limiter: RateLimiter) -> Arc<RateLimiter> {
        let limiter = Arc::new(limiter);
        self.limiters
            .insert(limiter.name().to_string(), limiter.clone());
        limiter
    }

    /// Get the limiter for a backend
    pub fn get(&self, name: &str) -> Option<Arc<RateLimiter>> {
        self.limiters.get(name).cloned()
    }

    /// Get the limiter for a backend, creating one with `base_interval`
    /// and the registry's policy when none is registered
    pub fn get_or_create(&mut self, name: &str, base_interval: Duration) -> Arc<RateLimiter> {
        let policy = self.policy.clone();
        self.limiters
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(RateLimiter::new(name, base_interval).with_policy(policy))
            })
            .clone()
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn contains(&self, name: &str) -> bool {
        self.limiters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

/// Sleep for `duration` unless `cancel` fires first
pub(crate) async fn sleep_or_cancel(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

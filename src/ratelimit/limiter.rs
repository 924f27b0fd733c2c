//! Adaptive per-backend request spacing

use super::classifier::{ErrorClass, ErrorClassifier};
use super::sleep_or_cancel;
use crate::error::{Cancelled, EngineError};
use rand::Rng;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Backoff parameters shared by every limiter of an orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Multiplied by `2^retry_count` on each escalation
    pub unit: Duration,
    /// Upper bound of the escalated interval
    pub max_wait: Duration,
    /// Random jitter added on each escalation is drawn from `0..max_jitter`
    pub max_jitter: Duration,
    /// Return to the base interval after a successful request
    pub reset_on_success: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            max_wait: crate::MAX_RETRY_WAIT,
            max_jitter: Duration::from_secs(1),
            reset_on_success: true,
        }
    }
}

impl BackoffPolicy {
    /// Interval after the `retry_count`-th escalation from `current`.
    ///
    /// The result is at least `current + unit` and at least
    /// `unit * 2^retry_count` plus jitter, capped at `max_wait`, so it grows
    /// strictly until the cap is reached.
    pub fn escalate(&self, retry_count: u32, current: Duration) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        let exponential = self.unit.saturating_mul(factor).saturating_add(self.jitter());
        let step = self.unit.max(Duration::from_millis(1));
        exponential
            .max(current.saturating_add(step))
            .min(self.max_wait)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
        }
    }
}

/// Snapshot of a limiter's mutable state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterState {
    pub base_interval: Duration,
    pub current_interval: Duration,
    pub last_request_at: Option<Instant>,
    pub retry_count: u32,
}

/// Enforces a minimum spacing between requests to one backend and
/// lengthens it when the backend signals overload.
///
/// The state lock is held across the sleeps, so concurrent callers of the
/// same limiter are serialized and each one is spaced from the previous.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    /// Interval asked for at construction, before capping
    configured_interval: Duration,
    policy: BackoffPolicy,
    classifier: ErrorClassifier,
    state: Mutex<RateLimiterState>,
}

impl RateLimiter {
    /// Create a limiter with the default policy and classifier
    pub fn new(name: impl Into<String>, base_interval: Duration) -> Self {
        let policy = BackoffPolicy::default();
        let configured_interval = base_interval;
        let base_interval = base_interval.min(policy.max_wait);
        Self {
            name: name.into(),
            configured_interval,
            policy,
            classifier: ErrorClassifier::default(),
            state: Mutex::new(RateLimiterState {
                base_interval,
                current_interval: base_interval,
                last_request_at: None,
                retry_count: 0,
            }),
        }
    }

    /// Set the backoff policy. A base interval above the policy's
    /// `max_wait` is lowered to it.
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        let state = self.state.get_mut();
        state.base_interval = self.configured_interval.min(policy.max_wait);
        state.current_interval = state.base_interval;
        self.policy = policy;
        self
    }

    /// Set the error classifier
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Block until `current_interval` has passed since the previous call,
    /// then stamp this call. The first call returns immediately.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let mut state = self.lock(cancel).await?;

        if let Some(last) = state.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < state.current_interval {
                let remaining = state.current_interval - elapsed;
                debug!("{}: waiting {:?} before next request", self.name, remaining);
                sleep_or_cancel(remaining, cancel).await?;
            }
        }

        state.last_request_at = Some(Instant::now());
        Ok(())
    }

    /// Classify `err` and, for throttling or API failures, escalate the
    /// interval and sleep for it before returning.
    pub async fn handle_error(
        &self,
        err: &EngineError,
        cancel: &CancellationToken,
    ) -> Result<ErrorClass, Cancelled> {
        let class = self.classifier.classify(err);
        if !class.triggers_backoff() {
            return Ok(class);
        }

        let mut state = self.lock(cancel).await?;
        state.retry_count = state.retry_count.saturating_add(1);
        state.current_interval = self.policy.escalate(state.retry_count, state.current_interval);

        warn!(
            "{}: {:?} error, interval raised to {:?} (retry {})",
            self.name, class, state.current_interval, state.retry_count
        );

        sleep_or_cancel(state.current_interval, cancel).await?;
        Ok(class)
    }

    /// Record a successful request
    pub async fn record_success(&self) {
        if !self.policy.reset_on_success {
            return;
        }
        let mut state = self.state.lock().await;
        if state.retry_count > 0 {
            debug!("{}: backoff reset after success", self.name);
            state.retry_count = 0;
            state.current_interval = state.base_interval;
        }
    }

    /// Current state snapshot
    pub async fn state(&self) -> RateLimiterState {
        *self.state.lock().await
    }

    pub async fn current_interval(&self) -> Duration {
        self.state.lock().await.current_interval
    }

    async fn lock(
        &self,
        cancel: &CancellationToken,
    ) -> Result<MutexGuard<'_, RateLimiterState>, Cancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            guard = self.state.lock() => Ok(guard),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn quiet_policy() -> BackoffPolicy {
        BackoffPolicy {
            unit: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
            max_jitter: Duration::ZERO,
            reset_on_success: true,
        }
    }

    fn limiter(base_ms: u64) -> RateLimiter {
        RateLimiter::new("fofa", Duration::from_millis(base_ms)).with_policy(quiet_policy())
    }

    fn throttled() -> EngineError {
        EngineError::RateLimited("too many requests".into())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_wait_is_immediate() {
        let limiter = limiter(2000);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        limiter.wait(&cancel).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_waits_are_spaced() {
        let limiter = limiter(2000);
        let cancel = CancellationToken::new();

        limiter.wait(&cancel).await.unwrap();
        let start = Instant::now();
        limiter.wait(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_are_serialized() {
        let limiter = Arc::new(limiter(500));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { limiter.wait(&cancel).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // first call is free, the other three are spaced by 500ms each
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_error_escalates_and_sleeps() {
        let limiter = limiter(100);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        let class = limiter.handle_error(&throttled(), &cancel).await.unwrap();
        assert_eq!(class, ErrorClass::RateLimit);

        let state = limiter.state().await;
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.current_interval, Duration::from_secs(2));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_grows_until_capped() {
        let limiter = limiter(100);
        let cancel = CancellationToken::new();
        let mut previous = limiter.current_interval().await;

        for _ in 0..5 {
            limiter.handle_error(&throttled(), &cancel).await.unwrap();
            let current = limiter.current_interval().await;
            assert!(current > previous);
            assert!(current <= crate::MAX_RETRY_WAIT);
            previous = current;
        }

        for _ in 0..5 {
            limiter.handle_error(&throttled(), &cancel).await.unwrap();
            assert_eq!(limiter.current_interval().await, Duration::from_secs(60));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_error_keeps_state() {
        let limiter = limiter(2000);
        let cancel = CancellationToken::new();
        let before = limiter.state().await;

        let start = Instant::now();
        let class = limiter
            .handle_error(&EngineError::Network("connection reset".into()), &cancel)
            .await
            .unwrap();

        assert_eq!(class, ErrorClass::Unrelated);
        assert_eq!(limiter.state().await, before);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_backoff() {
        let limiter = limiter(100);
        let cancel = CancellationToken::new();

        limiter.handle_error(&throttled(), &cancel).await.unwrap();
        limiter.record_success().await;

        let state = limiter.state().await;
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.current_interval, Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_policy_keeps_backoff() {
        let limiter = RateLimiter::new("quake", Duration::from_millis(100)).with_policy(
            BackoffPolicy {
                reset_on_success: false,
                ..quiet_policy()
            },
        );
        let cancel = CancellationToken::new();

        limiter.handle_error(&throttled(), &cancel).await.unwrap();
        limiter.record_success().await;
        assert_eq!(limiter.state().await.retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_wait() {
        let limiter = limiter(60_000);
        let cancel = CancellationToken::new();
        limiter.wait(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert_eq!(limiter.wait(&cancel).await, Err(Cancelled));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_base_still_escalates() {
        let limiter = limiter(5000);
        let cancel = CancellationToken::new();
        let mut previous = limiter.current_interval().await;

        while previous < Duration::from_secs(60) {
            limiter.handle_error(&throttled(), &cancel).await.unwrap();
            let current = limiter.current_interval().await;
            assert!(current > previous, "{:?} -> {:?}", previous, current);
            assert!(current <= Duration::from_secs(60));
            previous = current;
        }

        limiter.handle_error(&throttled(), &cancel).await.unwrap();
        assert_eq!(limiter.current_interval().await, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_base_above_max_wait_is_capped() {
        let limiter = limiter(90_000);
        let cancel = CancellationToken::new();
        assert_eq!(limiter.state().await.base_interval, Duration::from_secs(60));

        limiter.handle_error(&throttled(), &cancel).await.unwrap();
        assert_eq!(limiter.current_interval().await, Duration::from_secs(60));

        let unconfigured = RateLimiter::new("hunter", Duration::from_secs(90));
        assert_eq!(unconfigured.current_interval().await, crate::MAX_RETRY_WAIT);

        let relaxed = RateLimiter::new("quake", Duration::from_secs(90)).with_policy(BackoffPolicy {
            max_wait: Duration::from_secs(120),
            ..quiet_policy()
        });
        assert_eq!(relaxed.state().await.base_interval, Duration::from_secs(90));
    }

    #[test]
    fn test_escalate_moves_past_current() {
        let policy = quiet_policy();
        assert_eq!(
            policy.escalate(1, Duration::from_secs(10)),
            Duration::from_secs(11)
        );
        assert_eq!(policy.escalate(3, Duration::from_secs(2)), Duration::from_secs(8));
        assert_eq!(policy.escalate(40, Duration::ZERO), Duration::from_secs(60));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = BackoffPolicy {
            max_jitter: Duration::from_millis(1000),
            ..quiet_policy()
        };
        for _ in 0..50 {
            let interval = policy.escalate(2, Duration::ZERO);
            assert!(interval >= Duration::from_secs(4));
            assert!(interval < Duration::from_secs(5));
        }
    }
}

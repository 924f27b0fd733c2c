//! Metrics collection module
//!
//! Tracks per-backend request counts, error rates, returned assets and
//! response times for one run. In-memory only.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Response times kept per backend
const RESPONSE_WINDOW: usize = 100;

#[derive(Debug, Default)]
struct BackendCounters {
    requests: u64,
    errors: u64,
    assets: u64,
    response_times_ms: VecDeque<u64>,
}

/// Metrics collector shared by the orchestrators of a run
#[derive(Debug, Default)]
pub struct Metrics {
    /// Targets or companies processed
    subjects: AtomicU64,
    backends: RwLock<HashMap<String, BackendCounters>>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one processed target or company
    pub fn inc_subject(&self) {
        self.subjects.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one page request and its outcome
    pub fn record_request(&self, backend: &str, elapsed: Duration, assets: Option<usize>) {
        let mut backends = self
            .backends
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = backends.entry(backend.to_string()).or_default();

        entry.requests += 1;
        match assets {
            Some(count) => entry.assets += count as u64,
            None => entry.errors += 1,
        }

        if entry.response_times_ms.len() >= RESPONSE_WINDOW {
            entry.response_times_ms.pop_front();
        }
        entry.response_times_ms.push_back(elapsed.as_millis() as u64);
    }

    /// Targets or companies processed so far
    pub fn subjects(&self) -> u64 {
        self.subjects.load(Ordering::Relaxed)
    }

    /// Get average response time for a backend
    pub fn get_avg_response_time(&self, backend: &str) -> Option<u64> {
        let backends = self.backends.read().unwrap_or_else(PoisonError::into_inner);
        backends
            .get(backend)
            .and_then(|c| average(&c.response_times_ms))
    }

    /// Get reliability percentage for a backend
    pub fn get_reliability(&self, backend: &str) -> f64 {
        let backends = self.backends.read().unwrap_or_else(PoisonError::into_inner);
        backends.get(backend).map(reliability).unwrap_or(100.0)
    }

    /// Get all backend statistics, sorted by name
    pub fn get_backend_stats(&self) -> BTreeMap<String, BackendStats> {
        let backends = self.backends.read().unwrap_or_else(PoisonError::into_inner);
        backends
            .iter()
            .map(|(name, c)| {
                let stats = BackendStats {
                    requests: c.requests,
                    errors: c.errors,
                    assets: c.assets,
                    avg_response_time: average(&c.response_times_ms),
                    reliability: reliability(c),
                };
                (name.clone(), stats)
            })
            .collect()
    }
}

fn average(times: &VecDeque<u64>) -> Option<u64> {
    if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<u64>() / times.len() as u64)
    }
}

fn reliability(counters: &BackendCounters) -> f64 {
    if counters.requests == 0 {
        100.0
    } else {
        let ok = counters.requests - counters.errors;
        (ok as f64 / counters.requests as f64) * 100.0
    }
}

/// Statistics for a single backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStats {
    pub requests: u64,
    pub errors: u64,
    pub assets: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
}

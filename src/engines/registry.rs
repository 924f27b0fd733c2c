//! Engine registry for managing the configured search backends

use super::backend::HttpBackend;
use super::traits::{Backend, CompanyBackend, Engine};
use crate::config::EngineConfig;
use crate::network::HttpClient;
use crate::ratelimit::{BackoffPolicy, ErrorClassifier, RateLimiter, RateLimiters};
use std::sync::Arc;
use std::time::Duration;

/// Registry of the loaded engines, kept in registration order.
///
/// The order matters: the orchestrators try backends one after another in
/// exactly this order for every target.
pub struct EngineRegistry {
    engines: Vec<(Arc<dyn Engine>, EngineConfig)>,
}

impl EngineRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
        }
    }

    /// Register an engine. A second engine with the same name replaces the
    /// first one in place.
    pub fn register(&mut self, engine: Arc<dyn Engine>, config: EngineConfig) {
        match self
            .engines
            .iter_mut()
            .find(|(e, _)| e.name() == engine.name())
        {
            Some(slot) => *slot = (engine, config),
            None => self.engines.push((engine, config)),
        }
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Engine>> {
        self.engines
            .iter()
            .find(|(e, _)| e.name() == name)
            .map(|(e, _)| e)
    }

    /// Get engine config
    pub fn get_config(&self, name: &str) -> Option<&EngineConfig> {
        self.engines
            .iter()
            .find(|(e, _)| e.name() == name)
            .map(|(_, c)| c)
    }

    /// Keep only the named engines (case-insensitive), preserving order
    pub fn retain(&mut self, names: &[String]) {
        self.engines
            .retain(|(e, _)| names.iter().any(|n| n.eq_ignore_ascii_case(e.name())));
    }

    /// Get all engine names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.engines.iter().map(|(e, _)| e.name()).collect()
    }

    /// Check if an engine exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get number of registered engines
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    fn http_backends<'a>(
        &'a self,
        client: &'a HttpClient,
    ) -> impl Iterator<Item = (HttpBackend, &'a Arc<dyn Engine>)> + 'a {
        self.engines.iter().map(move |(engine, config)| {
            let backend =
                HttpBackend::new(engine.clone(), client.clone()).with_timeout(config.timeout());
            (backend, engine)
        })
    }

    /// Backends that search IP and domain targets
    pub fn target_backends(&self, client: &HttpClient) -> Vec<Arc<dyn Backend>> {
        self.http_backends(client)
            .filter(|(_, engine)| engine.kinds().is_empty())
            .map(|(backend, _)| Arc::new(backend) as Arc<dyn Backend>)
            .collect()
    }

    /// Backends that serve company intelligence subtypes
    pub fn company_backends(&self, client: &HttpClient) -> Vec<Arc<dyn CompanyBackend>> {
        self.http_backends(client)
            .filter(|(_, engine)| !engine.kinds().is_empty())
            .map(|(backend, _)| Arc::new(backend) as Arc<dyn CompanyBackend>)
            .collect()
    }

    /// One limiter per engine. The interval comes from the engine config or
    /// falls back to `default_interval`; configured patterns extend the
    /// default classifier.
    pub fn rate_limiters(&self, policy: &BackoffPolicy, default_interval: Duration) -> RateLimiters {
        let mut limiters = RateLimiters::new(policy.clone());
        for (engine, config) in &self.engines {
            let classifier = ErrorClassifier::default()
                .with_rate_limit_patterns(config.rate_limit_patterns.iter().cloned())
                .with_permission_patterns(config.permission_patterns.iter().cloned())
                .with_api_patterns(config.api_error_patterns.iter().cloned());
            let interval = config.interval().unwrap_or(default_interval);
            limiters.insert(
                RateLimiter::new(engine.name(), interval)
                    .with_policy(policy.clone())
                    .with_classifier(classifier),
            );
        }
        limiters
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

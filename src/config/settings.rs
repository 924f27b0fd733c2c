//! Settings structures for CScan-RS configuration

use crate::ratelimit::BackoffPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main settings structure matching settings.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub search: SearchSettings,
    pub outgoing: OutgoingSettings,
    pub engines: Vec<EngineConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            search: SearchSettings::default(),
            outgoing: OutgoingSettings::default(),
            engines: default_engines(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Merge with environment variables (CSCAN_* prefix)
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    /// Merge overrides from an arbitrary variable source
    pub fn merge_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("CSCAN_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Some(page) = var("CSCAN_MAX_PAGE").and_then(|v| v.parse().ok()) {
            self.search.max_page = page;
        }
        if let Some(size) = var("CSCAN_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.search.page_size = size;
        }
        if let Some(n) = var("CSCAN_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.search.concurrency = n;
        }

        let credentials = [
            ("hunter", "CSCAN_HUNTER_KEY", None),
            ("fofa", "CSCAN_FOFA_KEY", Some("CSCAN_FOFA_EMAIL")),
            ("quake", "CSCAN_QUAKE_KEY", None),
            ("zone", "CSCAN_ZONE_KEY", None),
        ];
        for (name, key_var, email_var) in credentials {
            let Some(engine) = self.engines.iter_mut().find(|e| e.name == name) else {
                continue;
            };
            if let Some(key) = var(key_var) {
                engine.api_key = Some(key);
            }
            if let Some(email) = email_var.and_then(&var) {
                engine.email = Some(email);
            }
        }
    }

    /// Reject values the orchestrators cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.search.max_page == 0 {
            bail!("search.max_page must be greater than 0");
        }
        if self.search.page_size == 0 {
            bail!("search.page_size must be greater than 0");
        }
        if self.search.concurrency == 0 {
            bail!("search.concurrency must be at least 1");
        }

        let durations = [
            ("search.company_pause", self.search.company_pause),
            ("search.default_interval", self.search.default_interval),
            ("search.max_retry_wait", self.search.max_retry_wait),
            ("search.backoff_unit", self.search.backoff_unit),
            ("search.max_jitter", self.search.max_jitter),
            ("outgoing.request_timeout", self.outgoing.request_timeout),
        ];
        for (name, value) in durations {
            check_seconds(name, value)?;
        }
        if self.search.default_interval > self.search.max_retry_wait {
            bail!("search.default_interval must not exceed search.max_retry_wait");
        }
        for engine in &self.engines {
            if let Some(interval) = engine.interval {
                let name = format!("engines.{}.interval", engine.name);
                check_seconds(&name, interval)?;
                if interval > self.search.max_retry_wait {
                    bail!("{} must not exceed search.max_retry_wait", name);
                }
            }
            if let Some(timeout) = engine.timeout {
                check_seconds(&format!("engines.{}.timeout", engine.name), timeout)?;
            }
        }
        Ok(())
    }

    /// Get engine config by name
    pub fn get_engine(&self, name: &str) -> Option<&EngineConfig> {
        self.engines.iter().find(|e| e.name == name)
    }

    /// Get all enabled engines
    pub fn enabled_engines(&self) -> Vec<&EngineConfig> {
        self.engines.iter().filter(|e| !e.disabled).collect()
    }
}

fn check_seconds(name: &str, value: f64) -> Result<()> {
    if Duration::try_from_secs_f64(value).is_err() {
        bail!("{} must be a non-negative number of seconds in range", name);
    }
    Ok(())
}

/// Seconds as a `Duration`, saturating instead of panicking on values
/// `validate` would reject
pub(crate) fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

/// General settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum pages fetched per backend and target
    pub max_page: u32,
    /// Results requested per page
    pub page_size: u32,
    /// Number of target pipelines allowed to run at once
    pub concurrency: usize,
    /// Pause between two companies (seconds)
    pub company_pause: f64,
    /// Minimum spacing between requests to one backend (seconds)
    pub default_interval: f64,
    /// Upper bound of the escalated interval (seconds)
    pub max_retry_wait: f64,
    /// Backoff unit multiplied by 2^retries (seconds)
    pub backoff_unit: f64,
    /// Maximum random jitter added to a backoff (seconds)
    pub max_jitter: f64,
    /// Return to the base interval after a successful request
    pub reset_on_success: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_page: 5,
            page_size: 100,
            concurrency: 1,
            company_pause: 2.0,
            default_interval: crate::DEFAULT_INTERVAL.as_secs_f64(),
            max_retry_wait: crate::MAX_RETRY_WAIT.as_secs_f64(),
            backoff_unit: 1.0,
            max_jitter: 1.0,
            reset_on_success: true,
        }
    }
}

impl SearchSettings {
    pub fn company_pause(&self) -> Duration {
        seconds(self.company_pause)
    }

    pub fn default_interval(&self) -> Duration {
        seconds(self.default_interval)
    }

    /// Backoff policy for the rate limiters
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            unit: seconds(self.backoff_unit),
            max_wait: seconds(self.max_retry_wait),
            max_jitter: seconds(self.max_jitter),
            reset_on_success: self.reset_on_success,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// User agent string (none = cscan-rs/<version>)
    pub user_agent: Option<String>,
    /// Pool max size
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 30.0,
            user_agent: None,
            pool_maxsize: 10,
            verify_ssl: true,
            proxies: ProxySettings::default(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Individual engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine name (unique identifier)
    pub name: String,
    /// Engine module to use
    pub engine: String,
    /// Whether engine is disabled
    pub disabled: bool,
    /// API key
    pub api_key: Option<String>,
    /// Account email (FOFA)
    pub email: Option<String>,
    /// Override of the API root URL
    pub base_url: Option<String>,
    /// Minimum spacing between requests in seconds
    pub interval: Option<f64>,
    /// Custom request timeout in seconds
    pub timeout: Option<f64>,
    /// Extra phrases marking a throttling error
    pub rate_limit_patterns: Vec<String>,
    /// Extra phrases marking a permission error
    pub permission_patterns: Vec<String>,
    /// Extra phrases marking a generic API error
    pub api_error_patterns: Vec<String>,
}

impl EngineConfig {
    /// Config for engine module `engine` registered under the same name
    pub fn new(engine: &str) -> Self {
        Self {
            name: engine.to_string(),
            engine: engine.to_string(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Configured API key, treating blanks as missing
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Configured interval, if any
    pub fn interval(&self) -> Option<Duration> {
        self.interval.map(seconds)
    }

    /// Configured timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(seconds)
    }
}

/// Default engine configurations
fn default_engines() -> Vec<EngineConfig> {
    ["hunter", "fofa", "quake", "zone"]
        .into_iter()
        .map(EngineConfig::new)
        .collect()
}

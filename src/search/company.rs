//! Company intelligence orchestration

use super::models::{BatchOutcome, CompanyResults};
use super::pagination::paginate;
use crate::config::Settings;
use crate::engines::{CompanyBackend, EngineRegistry};
use crate::error::{BatchError, BatchFailure};
use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::query::QueryTranslator;
use crate::ratelimit::{sleep_or_cancel, RateLimiters};
use crate::results::Asset;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause between two consecutive companies
pub const DEFAULT_COMPANY_PAUSE: Duration = Duration::from_secs(2);

/// What one company produced
#[derive(Debug, Default)]
pub struct CompanyOutcome {
    pub results: CompanyResults,
    /// Set when every subtype query failed
    pub failure: Option<BatchFailure>,
    pub cancelled: bool,
}

/// Company orchestrator. Companies are processed strictly one after
/// another with a pause in between; results are grouped by subtype.
pub struct CompanySearch {
    backends: Vec<Arc<dyn CompanyBackend>>,
    limiters: RateLimiters,
    translator: QueryTranslator,
    metrics: Arc<Metrics>,
    pause: Duration,
}

impl CompanySearch {
    pub fn new(backends: Vec<Arc<dyn CompanyBackend>>, mut limiters: RateLimiters) -> Self {
        for backend in &backends {
            limiters.get_or_create(backend.name(), crate::DEFAULT_INTERVAL);
        }
        Self {
            backends,
            limiters,
            translator: QueryTranslator::default(),
            metrics: Arc::new(Metrics::new()),
            pause: DEFAULT_COMPANY_PAUSE,
        }
    }

    /// Build from loaded engines and settings
    pub fn from_registry(registry: &EngineRegistry, client: &HttpClient, settings: &Settings) -> Self {
        let limiters = registry.rate_limiters(
            &settings.search.backoff_policy(),
            settings.search.default_interval(),
        );
        Self::new(registry.company_backends(client), limiters)
            .with_pause(settings.search.company_pause())
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn limiters(&self) -> &RateLimiters {
        &self.limiters
    }

    /// Search every company in order, pausing between companies
    pub async fn search_companies(
        &self,
        companies: &[String],
        max_page: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> BatchOutcome<CompanyResults> {
        info!(
            "Searching {} companies on {} backends",
            companies.len(),
            self.backends.len()
        );

        let mut results = CompanyResults::new();
        let mut failures = Vec::new();
        let mut cancelled = false;

        for (i, company) in companies.iter().enumerate() {
            if i > 0 && sleep_or_cancel(self.pause, cancel).await.is_err() {
                cancelled = true;
                break;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            self.metrics.inc_subject();
            let outcome = self
                .search_company(company, max_page, page_size, cancel)
                .await;
            info!("{}: {} assets", company, outcome.results.len());

            results.merge(outcome.results);
            failures.extend(outcome.failure);
            if outcome.cancelled {
                cancelled = true;
                break;
            }
        }

        let error = BatchError::from_failures(companies.len(), failures);
        if let Some(ref err) = error {
            warn!("{}", err);
        }
        BatchOutcome::new(results, error, cancelled)
    }

    /// Query every subtype of every backend for one company.
    ///
    /// A subtype whose first page fails is recorded as a single
    /// access-restricted placeholder so reports can tell it apart from a
    /// subtype without data.
    pub async fn search_company(
        &self,
        company: &str,
        max_page: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> CompanyOutcome {
        let mut outcome = CompanyOutcome::default();
        let query = self.translator.translate_company(company);
        if query.is_empty() {
            debug!("Skipping blank company name");
            return outcome;
        }

        let mut attempted = 0usize;
        let mut reasons = Vec::new();

        'backends: for backend in &self.backends {
            let name = backend.name();
            let Some(limiter) = self.limiters.get(name) else {
                continue;
            };

            for kind in backend.kinds() {
                if cancel.is_cancelled() {
                    outcome.cancelled = true;
                    break 'backends;
                }

                attempted += 1;
                let run = paginate(name, &limiter, &self.metrics, max_page, cancel, |page| {
                    backend.search_kind(&query, kind, page, page_size)
                })
                .await;

                if let Some(err) = run.first_page_error {
                    warn!("{}: {} search for {} failed: {}", name, kind, company, err);
                    let placeholder = Asset::access_restricted(name, kind, &err.to_string());
                    outcome.results.extend(kind, [placeholder]);
                    reasons.push(format!("{}/{}: {}", name, kind, err));
                } else {
                    debug!("{}: {} {} assets for {}", name, run.assets.len(), kind, company);
                }
                outcome
                    .results
                    .extend(kind, run.assets.into_iter().filter(|a| kind.accepts(a)));

                if run.cancelled {
                    outcome.cancelled = true;
                    break 'backends;
                }
            }
        }

        if attempted > 0 && reasons.len() == attempted {
            outcome.failure = Some(BatchFailure {
                subject: company.to_string(),
                reasons,
            });
        }
        outcome
    }
}

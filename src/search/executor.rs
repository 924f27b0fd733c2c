//! Search execution and orchestration

use super::models::BatchOutcome;
use super::pagination::paginate;
use crate::config::Settings;
use crate::engines::{Backend, EngineRegistry};
use crate::error::{BatchError, BatchFailure};
use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::query::QueryTranslator;
use crate::ratelimit::RateLimiters;
use crate::results::{Asset, ResultContainer, Target};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the pipeline of one target produced
#[derive(Debug, Default)]
pub struct TargetOutcome {
    pub assets: Vec<Asset>,
    /// Set when at least one backend was tried and all of them failed on
    /// their first page
    pub failure: Option<BatchFailure>,
    pub cancelled: bool,
}

/// Target orchestrator: fans a target list out over the configured
/// backends, one task per target, and merges what comes back.
///
/// Cloning is cheap and clones share limiters and metrics.
#[derive(Clone)]
pub struct Search {
    backends: Arc<Vec<Arc<dyn Backend>>>,
    limiters: Arc<RateLimiters>,
    translator: Arc<QueryTranslator>,
    metrics: Arc<Metrics>,
    concurrency: usize,
}

impl Search {
    /// Create an orchestrator over `backends`, tried in the given order.
    /// Backends without a limiter in `limiters` get one with the default
    /// interval.
    pub fn new(backends: Vec<Arc<dyn Backend>>, mut limiters: RateLimiters) -> Self {
        for backend in &backends {
            limiters.get_or_create(backend.name(), crate::DEFAULT_INTERVAL);
        }
        Self {
            backends: Arc::new(backends),
            limiters: Arc::new(limiters),
            translator: Arc::new(QueryTranslator::default()),
            metrics: Arc::new(Metrics::new()),
            concurrency: 1,
        }
    }

    /// Build from loaded engines and settings
    pub fn from_registry(registry: &EngineRegistry, client: &HttpClient, settings: &Settings) -> Self {
        let limiters = registry.rate_limiters(
            &settings.search.backoff_policy(),
            settings.search.default_interval(),
        );
        Self::new(registry.target_backends(client), limiters)
            .with_concurrency(settings.search.concurrency)
    }

    /// Number of targets processed at once (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_translator(mut self, translator: QueryTranslator) -> Self {
        self.translator = Arc::new(translator);
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

    /// Backend names in the order they are tried
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Run every target through every backend.
    ///
    /// Targets are admitted in list order through a gate of
    /// `concurrency` slots. Failures of single backends or targets never
    /// abort the batch; targets that produced nothing are listed in the
    /// outcome's error. When `cancel` fires, no further targets are
    /// admitted and the assets collected so far are returned.
    pub async fn search_targets(
        &self,
        targets: &[Target],
        max_page: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> BatchOutcome<Vec<Asset>> {
        info!(
            "Searching {} targets on {} backends (concurrency {})",
            targets.len(),
            self.backends.len(),
            self.concurrency
        );

        let container = ResultContainer::new();
        let gate = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(targets.len());
        let mut subjects = Vec::with_capacity(targets.len());
        let mut cancelled = false;

        for target in targets {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = gate.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            subjects.push(target.value.clone());
            let search = self.clone();
            let target = target.clone();
            let container = container.clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                search.metrics.inc_subject();
                let outcome = search
                    .search_single(&target, max_page, page_size, &cancel)
                    .await;
                container.extend_assets(outcome.assets);
                if let Some(failure) = outcome.failure {
                    container.add_failure(failure);
                }
                outcome.cancelled
            }));
        }

        let mut aborted = Vec::new();
        for (subject, result) in subjects.into_iter().zip(join_all(handles).await) {
            match result {
                Ok(task_cancelled) => cancelled |= task_cancelled,
                Err(e) => {
                    error!("Target task for {} failed: {}", subject, e);
                    aborted.push(BatchFailure {
                        subject,
                        reasons: vec![format!("task failed: {}", e)],
                    });
                }
            }
        }

        let (assets, mut failures) = container.drain();
        failures.extend(aborted);
        let error = BatchError::from_failures(targets.len(), failures);
        if let Some(ref err) = error {
            warn!("{}", err);
        }
        info!(
            "Collected {} assets for {} targets{}",
            assets.len(),
            targets.len(),
            if cancelled { " (cancelled)" } else { "" }
        );

        BatchOutcome::new(assets, error, cancelled)
    }

    /// Run one target through every backend in order
    pub async fn search_single(
        &self,
        target: &Target,
        max_page: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> TargetOutcome {
        let mut outcome = TargetOutcome::default();
        let mut attempted = 0usize;
        let mut reasons = Vec::new();

        for backend in self.backends.iter() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let name = backend.name();
            let query = self.translator.translate(name, target);
            if query.is_empty() {
                debug!("{}: no query for {}, skipping", name, target);
                continue;
            }
            let Some(limiter) = self.limiters.get(name) else {
                continue;
            };

            attempted += 1;
            debug!("{}: searching {} with {}", name, target, query);
            let run = paginate(name, &limiter, &self.metrics, max_page, cancel, |page| {
                backend.search(&query, page, page_size)
            })
            .await;

            if let Some(err) = run.first_page_error {
                reasons.push(format!("{}: {}", name, err));
            } else if !run.assets.is_empty() {
                info!("{}: {} assets for {}", name, run.assets.len(), target);
            }
            outcome.assets.extend(run.assets);

            if run.cancelled {
                outcome.cancelled = true;
                break;
            }
        }

        if attempted > 0 && reasons.len() == attempted {
            outcome.failure = Some(BatchFailure {
                subject: target.value.clone(),
                reasons,
            });
        }
        outcome
    }
}

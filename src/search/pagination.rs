//! Rate-limited pagination of one query against one backend

use crate::error::EngineError;
use crate::metrics::Metrics;
use crate::ratelimit::RateLimiter;
use crate::results::Asset;
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What paginating one query produced
#[derive(Debug, Default)]
pub(crate) struct PageRun {
    /// Assets of every page fetched before stopping
    pub assets: Vec<Asset>,
    /// Set when the first page failed; the backend contributed nothing
    pub first_page_error: Option<EngineError>,
    pub cancelled: bool,
}

/// Fetch pages `1..=max_page` through `limiter`.
///
/// Stops at the first empty page, at the first error (after the limiter
/// has applied its backoff), or when `cancel` fires. Pages collected before
/// an error on a later page are kept.
pub(crate) async fn paginate<F, Fut>(
    backend: &str,
    limiter: &RateLimiter,
    metrics: &Metrics,
    max_page: u32,
    cancel: &CancellationToken,
    mut fetch: F,
) -> PageRun
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<Asset>, EngineError>>,
{
    let mut run = PageRun::default();

    for page in 1..=max_page {
        if limiter.wait(cancel).await.is_err() {
            run.cancelled = true;
            break;
        }

        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                run.cancelled = true;
                break;
            }
            result = fetch(page) => result,
        };
        let elapsed = start.elapsed();

        match result {
            Ok(assets) => {
                metrics.record_request(backend, elapsed, Some(assets.len()));
                limiter.record_success().await;
                if assets.is_empty() {
                    debug!("{}: no results on page {}, done", backend, page);
                    break;
                }
                debug!("{}: {} results on page {}", backend, assets.len(), page);
                run.assets.extend(assets);
            }
            Err(err) => {
                metrics.record_request(backend, elapsed, None);
                warn!("{}: page {} failed: {}", backend, page, err);
                if limiter.handle_error(&err, cancel).await.is_err() {
                    run.cancelled = true;
                }
                if page == 1 {
                    run.first_page_error = Some(err);
                }
                break;
            }
        }
    }

    run
}

//! CScan-RS: asset discovery over cyberspace search engines
//!
//! This is the main entry point for the application.

use anyhow::{bail, Context, Result};
use cscan_rs::{
    cli::{Cli, Command},
    config::{self, Settings},
    engines::{EngineLoader, EngineRegistry},
    input,
    metrics::Metrics,
    network::HttpClient,
    output::{self, OutputFormat},
    results, CompanySearch, Search,
};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load configuration
    let mut settings = config::load(cli.config.as_deref())?;

    // Initialize logging
    let default_level = if settings.general.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    info!("Starting CScan-RS v{}", cscan_rs::VERSION);

    // Initialize HTTP client
    let client = HttpClient::with_settings(&settings.outgoing)?;

    // Ctrl-C stops admitting work; whatever was collected is still written
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing with partial results");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Command::Targets {
            input,
            output,
            engines,
            format,
            concurrency,
            max_page,
        } => {
            if let Some(n) = concurrency {
                settings.search.concurrency = n;
            }
            if let Some(n) = max_page {
                settings.search.max_page = n;
            }
            settings.validate()?;

            let mut registry = EngineLoader::load(&settings);
            if !engines.is_empty() {
                registry.retain(&engines);
            }
            let format = format
                .or_else(|| OutputFormat::from_path(&output))
                .unwrap_or_default();
            run_targets(&settings, &registry, &client, &input, &output, format, &cancel).await
        }
        Command::Companies {
            input,
            output,
            max_page,
        } => {
            if let Some(n) = max_page {
                settings.search.max_page = n;
            }
            settings.validate()?;

            let registry = EngineLoader::load(&settings);
            run_companies(&settings, &registry, &client, &input, &output, &cancel).await
        }
    }
}

async fn run_targets(
    settings: &Settings,
    registry: &EngineRegistry,
    client: &HttpClient,
    input_file: &Path,
    output_file: &Path,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let targets = input::read_targets(input_file)?;
    if targets.is_empty() {
        bail!("no valid targets in {}", input_file.display());
    }

    let search = Search::from_registry(registry, client, settings);
    if search.backend_names().is_empty() {
        bail!("no target engine is enabled and configured");
    }
    info!("Using engines: {}", search.backend_names().join(", "));

    let outcome = search
        .search_targets(
            &targets,
            settings.search.max_page,
            settings.search.page_size,
            cancel,
        )
        .await;

    let assets = results::deduplicate(outcome.results);
    output::write_targets(
        output_file,
        format,
        &assets,
        outcome.error.as_ref(),
        outcome.cancelled,
    )
    .context("failed to save results")?;

    log_stats(search.metrics());
    Ok(())
}

async fn run_companies(
    settings: &Settings,
    registry: &EngineRegistry,
    client: &HttpClient,
    input_file: &Path,
    output_file: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let companies = input::read_companies(input_file)?;
    if companies.is_empty() {
        bail!("no valid company names in {}", input_file.display());
    }

    let search = CompanySearch::from_registry(registry, client, settings);
    if registry.company_backends(client).is_empty() {
        bail!("no company engine is enabled and configured");
    }
    let outcome = search
        .search_companies(
            &companies,
            settings.search.max_page,
            settings.search.page_size,
            cancel,
        )
        .await;

    output::write_company_report(output_file, &outcome.results)
        .context("failed to save company report")?;

    log_stats(search.metrics());
    Ok(())
}

fn log_stats(metrics: &Metrics) {
    info!("Processed {} subjects", metrics.subjects());
    for (name, stats) in metrics.get_backend_stats() {
        info!(
            "{}: {} requests, {} errors, {} assets, avg {} ms, reliability {:.0}%",
            name,
            stats.requests,
            stats.errors,
            stats.assets,
            stats
                .avg_response_time
                .map(|ms| ms.to_string())
                .unwrap_or_else(|| "-".to_string()),
            stats.reliability
        );
    }
}

//! iiif-level0 - mirror a dynamic IIIF image server into a static Level 0 tile set.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iiif_level0::{
    config::load_targets, BatchRunner, Config, FetchOptions, HttpImageSource, RateLimiter,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let targets = match load_targets(&config.targets) {
        Ok(targets) => targets,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Output: {}", config.output.display());
    info!("  Domain: {}", config.normalized_domain());
    info!("  Tile size: {}", config.tile_size);
    info!("  Images: {}", targets.len());
    info!(
        "  Concurrency: {}, sleep: {}s, timeout: {}s",
        config.concurrency, config.sleep, config.timeout
    );

    let source = match HttpImageSource::with_timeout(config.timeout_duration()) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let options = FetchOptions {
        concurrency: config.concurrency,
        limiter: Arc::new(RateLimiter::new(config.sleep_duration())),
        cancel,
    };

    let mut runner = match BatchRunner::from_targets(
        source,
        options,
        &targets,
        &config.output,
        config.normalized_domain(),
        config.tile_size,
    ) {
        Ok(runner) => runner.with_prune(config.prune),
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.clean {
        if let Err(e) = runner.clean_all() {
            error!("Clean failed: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let init_failures = runner.initialize_all().await;
    info!("Tiles pending: {}", runner.total_pending());

    let report = runner.run().await;

    info!("");
    info!("Fetched: {}, already present: {}", report.fetched, report.skipped);
    if report.pruned > 0 {
        info!("Pruned: {}", report.pruned);
    }
    for failure in init_failures.iter().chain(&report.image_failures) {
        error!("Image failed: {}", failure);
    }
    for failure in &report.tile_failures {
        error!("Tile failed: {}", failure);
    }

    if report.cancelled {
        warn!("Interrupted; rerun to resume");
        return ExitCode::FAILURE;
    }
    if !init_failures.is_empty() || report.has_failures() {
        return ExitCode::FAILURE;
    }

    info!("All images complete");
    ExitCode::SUCCESS
}

/// Cancel the run on Ctrl-C; in-flight writes still finish or are discarded.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight requests");
            cancel.cancel();
        }
    });
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iiif_level0=debug"
    } else {
        "iiif_level0=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

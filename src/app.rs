//! Top-level application wiring.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses flags
//! - initializes logging
//! - binds the HTTP listener
//! - starts the scheduler thread
//! - serves metrics until SIGINT/SIGTERM, then shuts both down

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::data::{EcbClient, RateSource, WebClient};
use crate::domain::ExporterConfig;
use crate::error::AppError;
use crate::metrics::{INFO, MetricsRegistry};

pub mod orchestrator;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{Orchestrator, PassReport};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Entry point for the `euribor-exporter` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    let rejected_level = cli.rejected_log_level().map(str::to_string);
    let config = cli.into_config();
    init_tracing(&config.log_level);
    if let Some(level) = rejected_level {
        tracing::warn!(level = %level, "Invalid log level, using info");
    }

    tracing::info!(
        version = VERSION,
        listen_address = %config.listen_address,
        metrics_path = %config.metrics_path,
        scrape_interval = ?config.scrape_interval,
        ecb_enabled = config.ecb_enabled,
        "Starting Euribor Prometheus Exporter"
    );

    let registry = Arc::new(MetricsRegistry::with_exporter_metrics());
    registry.publish(
        INFO,
        &[("version", VERSION), ("source", source_description(&config))],
        1.0,
    );

    // Blocking HTTP clients must be built outside the async runtime.
    let orchestrator = build_orchestrator(&config, Arc::clone(&registry))?;
    let router = crate::server::build_router(registry, &config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start async runtime: {e}")))?;

    let listener = runtime.block_on(crate::server::bind(&config))?;
    tracing::info!(address = %config.listen_address, "Starting HTTP server");

    let scheduler = Scheduler::new(orchestrator, config.scrape_interval).spawn()?;

    let served = runtime.block_on(crate::server::serve_until(
        listener,
        router,
        async {
            crate::server::shutdown_signal().await;
            tracing::info!("Received shutdown signal");
            scheduler.request_stop();
        },
        config.shutdown_grace,
    ));

    tracing::info!("Waiting for in-flight metrics update to finish");
    let stopped = scheduler.join();
    tracing::info!("Exporter stopped");

    served?;
    stopped.map(|_| ())
}

/// Web source always; ECB only when enabled.
pub fn build_orchestrator(
    config: &ExporterConfig,
    registry: Arc<MetricsRegistry>,
) -> Result<Orchestrator, AppError> {
    let mut sources: Vec<Arc<dyn RateSource>> = vec![Arc::new(WebClient::new(
        &config.web_base_url,
        config.web_timeout,
    )?)];
    if config.ecb_enabled {
        sources.push(Arc::new(EcbClient::new(
            &config.ecb_base_url,
            config.ecb_timeout,
        )?));
    }
    Ok(Orchestrator::new(registry, sources))
}

fn source_description(config: &ExporterConfig) -> &'static str {
    if config.ecb_enabled {
        "dual-source: ECB + daily scraper"
    } else {
        "daily scraper"
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

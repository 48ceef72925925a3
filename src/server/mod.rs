//! HTTP listener: metrics exposition, landing page and health check.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;

use crate::cli::format_duration;
use crate::domain::{ExporterConfig, Maturity};
use crate::error::AppError;
use crate::metrics::MetricsRegistry;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
struct ServerState {
    registry: Arc<MetricsRegistry>,
    landing: Arc<str>,
}

/// Build the router. Exposed separately from `serve_until` for tests.
pub fn build_router(registry: Arc<MetricsRegistry>, config: &ExporterConfig) -> Router {
    let state = ServerState {
        registry,
        landing: landing_page(config).into(),
    };

    Router::new()
        .route(&config.metrics_path, get(metrics))
        .route("/health", get(health))
        .route("/", get(landing))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn bind(config: &ExporterConfig) -> Result<TcpListener, AppError> {
    let addr = config.listen_address;
    TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::new(3, format!("Failed to bind {addr}: {e}")))
}

/// Serve until `shutdown` resolves, then allow in-flight requests up to
/// `grace` to finish before the server task is aborted.
pub async fn serve_until<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
    grace: Duration,
) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    let stopping = Arc::new(Notify::new());
    let trigger = Arc::clone(&stopping);

    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { trigger.notified().await })
            .await
    });

    tokio::select! {
        res = &mut server => return flatten(res),
        _ = shutdown => {}
    }

    stopping.notify_one();
    match tokio::time::timeout(grace, &mut server).await {
        Ok(res) => flatten(res),
        Err(_) => {
            tracing::warn!(grace = ?grace, "HTTP server did not drain in time; forcing shutdown");
            server.abort();
            Ok(())
        }
    }
}

fn flatten(res: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), AppError> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AppError::new(3, format!("HTTP server error: {e}"))),
        Err(e) => Err(AppError::new(3, format!("HTTP server task failed: {e}"))),
    }
}

/// Resolves on SIGINT or (on unix) SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn metrics(State(state): State<ServerState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], state.registry.render())
}

async fn health() -> &'static str {
    "OK"
}

async fn landing(State(state): State<ServerState>) -> Html<String> {
    Html(state.landing.to_string())
}

fn landing_page(config: &ExporterConfig) -> String {
    let maturities = Maturity::ALL
        .iter()
        .map(|m| m.code())
        .collect::<Vec<_>>()
        .join(", ");
    let mut sources = String::from("<li>Daily: euribor-rates.eu</li>");
    if config.ecb_enabled {
        sources.push_str("\n<li>Monthly: ECB Data Portal</li>");
    }

    format!(
        r#"<html>
<head><title>Euribor Exporter</title></head>
<body>
<h1>Euribor Prometheus Exporter</h1>
<p><a href="{path}">Metrics</a></p>
<h2>Configuration</h2>
<ul>
<li>Scrape Interval: {interval}</li>
<li>Maturities: {maturities}</li>
</ul>
<h2>Data Sources</h2>
<ul>
{sources}
</ul>
</body>
</html>"#,
        path = config.metrics_path,
        interval = format_duration(config.scrape_interval),
    )
}

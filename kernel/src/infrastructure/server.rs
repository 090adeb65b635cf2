use crate::api;
use crate::host::GroveHostState;
use crate::infrastructure::config::BindAddress;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::Future;

async fn health_check() -> &'static str {
    "OK"
}

/// Health probes plus the branch API, without the metrics endpoint.
pub fn app(state: GroveHostState) -> Router {
    Router::new()
        .route("/health/live", get(health_check))
        .route("/health/ready", get(health_check))
        .merge(api::router(state))
}

/// Runs the HTTP server until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters an error while running.
pub async fn run_server(
    addr: BindAddress,
    state: GroveHostState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {e}"))?;

    let app = app(state).route("/metrics", get(move || std::future::ready(handle.render())));

    let addr = addr.to_socket_addr()?;
    tracing::info!("Grove API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

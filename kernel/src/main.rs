//! Grove kernel binary: loads configuration, wires the store and engine,
//! and serves the branch API until a shutdown signal arrives.

use grove_kernel::host::GroveHostState;
use grove_kernel::infrastructure::{
    audit,
    config::{BindAddress, Settings},
    server,
    telemetry::TelemetryBuilder,
};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new()?;

    let mut telemetry_builder = TelemetryBuilder::new("grove-kernel", env!("CARGO_PKG_VERSION"))
        .with_log_level(config.telemetry.log_level.clone())
        .with_json(config.telemetry.json)
        .with_sampling_ratio(config.telemetry.sampling_ratio);

    telemetry_builder = if let Some(ref endpoint) = config.telemetry.otlp_endpoint {
        telemetry_builder.with_tracing(endpoint)
    } else {
        telemetry_builder
    };

    telemetry_builder.init()?;

    info!("Grove Kernel Starting...");
    audit::log_audit(&audit::AuditEvent::SystemStartup {
        component: "Kernel".into(),
    });

    let state = match GroveHostState::new(&config).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize host state: {:?}", e);
            std::process::exit(1);
        }
    };

    let addr = BindAddress(config.server.host.clone(), config.server.port);
    if let Err(e) = server::run_server(addr, state, shutdown_signal()).await {
        error!("HTTP server failed: {:?}", e);
    }

    info!("Shutdown signal received, cleaning up...");
    audit::log_audit(&audit::AuditEvent::SystemShutdown {
        reason: "Signal received".into(),
    });

    info!("Grove Kernel Shutdown Complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

use anyhow::{Context, Result};
use image_service::config::ServiceConfig;
use image_service::{
    start_api_server, AppState, Config, ImageService, MySqlRecordStore, S3ObjectStore, UuidTokens,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_observability(&config.service)?;

    let state = build_state(&config).await?;

    // Runs until SIGINT/SIGTERM; bind and serve errors end the process
    start_api_server(state, &config.api, shutdown_signal()).await?;

    info!(service = %config.service.name, "Image service stopped");

    Ok(())
}

/// JSON logs filtered by `RUST_LOG` or the configured level, plus the
/// Prometheus exporter
fn init_observability(service: &ServiceConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&service.log_level))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();

    PrometheusBuilder::new()
        .with_http_listener((Ipv4Addr::UNSPECIFIED, service.metrics_port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(
        service = %service.name,
        metrics_port = service.metrics_port,
        "Starting image service"
    );

    Ok(())
}

/// Connect both stores once and share them with every request
async fn build_state(config: &Config) -> Result<AppState> {
    let records = MySqlRecordStore::new(&config.database)
        .await
        .context("Failed to initialize record store")?;

    if config.database.run_migrations {
        records
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let objects = S3ObjectStore::new(&config.s3)
        .await
        .context("Failed to initialize S3 object store")?;

    Ok(AppState {
        images: Arc::new(ImageService::new(
            Arc::new(objects),
            Arc::new(records),
            Arc::new(UuidTokens),
        )),
    })
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c() => info!("Received Ctrl+C, draining requests"),
                    _ = terminate.recv() => info!("Received SIGTERM, draining requests"),
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
        info!("Received Ctrl+C, draining requests");
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}

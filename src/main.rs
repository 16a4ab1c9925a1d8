//! Traffic Sign Classification Service - Main Entry Point
//!
//! Loads the classifier once at startup and serves `/health` and `/predict`
//! until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use traffic_sign_service::{
    api::{self, AppState},
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    models::inference::InferenceEngine,
};

/// HTTP inference service for traffic sign images
#[derive(Parser, Debug)]
#[command(name = "traffic-sign-service")]
#[command(version)]
#[command(about = "Classifies uploaded traffic sign images")]
struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(short, long, env = "SIGNSERVE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    init_tracing(&config.logging)?;

    info!("Starting Traffic Sign Classification Service v{}", env!("CARGO_PKG_VERSION"));
    info!(
        model = %config.model.path.display(),
        bind = %config.server.bind_address(),
        cors_origins = ?config.cors.allowed_origins,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());

    // The service never comes up without a working model
    let engine = Arc::new(
        InferenceEngine::new(&config, metrics.clone()).context("Model initialization failed")?,
    );
    info!(
        input_shape = %engine.input_shape(),
        classes = engine.registry().len(),
        "Model ready"
    );

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = Arc::new(AppState::new(engine, metrics.clone()));
    let app = api::router(state, &config);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("traffic_sign_service={}", logging.level).parse()?)
        .add_directive(format!("tower_http={}", logging.level).parse()?);

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

//! Gesture Playback (mgvp-gp) - Main entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mgvp_common::config::load_toml_config;
use mgvp_common::time::SystemClock;
use mgvp_gp::budget::HttpBudgetAuthority;
use mgvp_gp::config::{Args, ServiceConfig};
use mgvp_gp::playback::HttpSequenceProvider;
use mgvp_gp::SharedState;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for the final budget report
const FINAL_REPORT_GRACE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolved before tracing so a configured level can seed the filter
    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;
    let config =
        ServiceConfig::resolve(&args, &toml_config).context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting MGVP Gesture Playback v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.port
    );
    info!("Budget authority: {}", config.authority_url);
    info!("Sequence provider: {}", config.sequence_url);
    info!(
        "Heartbeat every {}s, max scrub rate {}x",
        config.heartbeat_interval.as_secs(),
        config.max_scrub_rate
    );

    let authority = HttpBudgetAuthority::new(config.authority_url.clone())
        .context("Failed to create budget authority client")?;
    let sequences = HttpSequenceProvider::new(config.sequence_url.clone())
        .context("Failed to create sequence provider client")?;

    let state = Arc::new(SharedState::new(
        config,
        SystemClock::shared(),
        Arc::new(authority),
        Arc::new(sequences),
    ));

    mgvp_gp::api::run(state.clone(), shutdown_signal())
        .await
        .context("Server error")?;

    // Ends the budget session so the authority stops counting
    let active = state.session.lock().await.take();
    if let Some(handle) = active {
        match handle.shutdown(FINAL_REPORT_GRACE).await {
            Ok(outcome) => info!("Active session stopped on shutdown: {:?}", outcome),
            Err(e) => warn!("Failed to stop session on shutdown: {}", e),
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

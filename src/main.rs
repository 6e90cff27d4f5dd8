//! # Club Auth - Main Entry Point
//!
//! Loads configuration, installs logging and serves the authentication API until the
//! process receives Ctrl+C or SIGTERM.
//!
//! The configuration file path comes from `CLUB_CONFIG_PATH` and defaults to
//! `config/club.yaml`. Any `CLUB_*` environment variable overrides the matching file value.

use tracing::{error, info};

use club_auth::core::error::ClubResult;
use club_auth::observability::init_logging;
use club_auth::{ClubConfig, ClubServer, IdentityStores};

const DEFAULT_CONFIG_PATH: &str = "config/club.yaml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging may not be installed yet when configuration fails.
        eprintln!("club-auth failed: {}", e);
        error!("Failed to run club-auth: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> ClubResult<()> {
    let config_path =
        std::env::var("CLUB_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = ClubConfig::load(&config_path).await?;
    init_logging(&config.observability.logging)?;

    info!("🚀 Starting club-auth");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration loaded from {}", config_path);
    info!("🔐 Public routes: {:?}", config.access.public_routes);

    let server = ClubServer::new(&config, IdentityStores::in_memory())?;
    info!("🌐 Serving on {}", server.bind_addr());

    server.start(shutdown_signal()).await?;

    info!("✅ club-auth shutdown complete");
    Ok(())
}

/// Resolve when the process is asked to stop
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("📡 Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        _ = terminate => info!("📡 Received SIGTERM, initiating graceful shutdown..."),
    }
}

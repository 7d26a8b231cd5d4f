//! bookmend - Library metadata repair service
//!
//! Scans book library folders laid out as author/title, flags
//! suspicious names, asks an AI service for corrections and applies
//! merge-safe folder renames, either automatically or after operator
//! approval through the JSON API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookmend::AppState;
use bookmend_common::config::{self, SettingsSource};

/// Command-line arguments for bookmend
#[derive(Parser, Debug)]
#[command(name = "bookmend")]
#[command(about = "Library metadata repair service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5060", env = "BOOKMEND_PORT")]
    port: u16,

    /// Settings file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the catalog database
    #[arg(short, long, env = "BOOKMEND_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookmend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting bookmend on port {}", args.port);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = config::resolve_config_path(args.config.as_deref());
    info!("Settings file: {}", config_path.display());
    let settings = SettingsSource::new(config_path);

    let data_dir = args.data_dir.unwrap_or_else(config::default_data_dir);
    let db_path = data_dir.join("bookmend.db");
    info!("Database: {}", db_path.display());

    let pool = bookmend_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(pool, settings);

    // The worker runs from startup; /api/worker/stop pauses it.
    state.worker.start(state.worker_context()).await;

    let app = bookmend::build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.worker.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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

//! Campaign Dispatcher (bulkline-cd) - Main entry point
//!
//! HTTP service that accepts campaign submissions (message + contact
//! list + optional attachment) and dispatches them through the single
//! browser-automation session.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bulkline_cd::api::{self, AppContext};
use bulkline_cd::config::Config;
use bulkline_cd::db;
use bulkline_cd::dispatch::run::CampaignRunner;
use bulkline_cd::session::SessionManager;
use bulkline_cd::state::SharedState;
use bulkline_cd::storage::LocalArtifactStore;

/// Command-line arguments for bulkline-cd
#[derive(Parser, Debug)]
#[command(name = "bulkline-cd")]
#[command(about = "Campaign Dispatcher service for Bulkline")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5760", env = "BULKLINE_CD_PORT")]
    port: u16,

    /// Root folder for database, uploads, artifacts, and browser profile
    #[arg(short, long, env = "BULKLINE_ROOT_FOLDER")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bulkline_cd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Bulkline Campaign Dispatcher (bulkline-cd) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = bulkline_common::config::resolve_root_folder(
        args.root_folder.as_deref(),
        "BULKLINE_ROOT_FOLDER",
    )
    .context("Failed to resolve root folder")?;
    bulkline_common::config::ensure_root_folder(&root_folder)
        .context("Failed to create root folder")?;
    info!("Root folder: {}", root_folder.display());

    let config = Arc::new(Config::load(root_folder).context("Failed to load configuration")?);

    // Initialize database
    let pool = db::connect(&config.db_path)
        .await
        .context("Failed to open database")?;
    db::init::init_schema(&pool)
        .await
        .context("Failed to initialize database schema")?;
    info!("Database ready: {}", config.db_path.display());

    // Shared components
    let state = Arc::new(SharedState::new());
    let session = Arc::new(SessionManager::new(
        config.session.clone(),
        config.dispatch.poll_interval(),
    ));
    let store = Arc::new(LocalArtifactStore::new(config.artifact_dir.clone()));
    let runner = Arc::new(CampaignRunner::new(
        pool.clone(),
        Arc::clone(&config),
        Arc::clone(&session),
        Arc::clone(&state),
        store,
    ));

    let ctx = AppContext {
        db: pool,
        config: Arc::clone(&config),
        state,
        session: Arc::clone(&session),
        runner,
    };
    let app = api::create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    session.shutdown().await;
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

//! qfraud-api - transaction fraud training service
//!
//! Accepts labeled transaction CSVs, trains a small variational circuit
//! classifier per project in a bounded background worker pool, and pushes
//! training progress to listeners over Server-Sent Events.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use qfraud_common::config::{LoggingConfig, RootFolderInitializer, RootFolderResolver};
use qfraud_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qfraud_api::services::mailer_from_config;
use qfraud_api::AppState;

/// Command-line arguments for qfraud-api
#[derive(Parser, Debug)]
#[command(name = "qfraud-api")]
#[command(about = "Fraud detection training service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "QFRAUD_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind (overrides the config file)
    #[arg(long, env = "QFRAUD_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "QFRAUD_PORT")]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long, env = "QFRAUD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new("qfraud-api")
        .with_cli_root_folder(args.root_folder.clone())
        .with_config_file(args.config.clone());
    // Logging settings live in the TOML file, so problems with it are held
    // until the subscriber is installed.
    let loaded = resolver.try_load_toml();
    let toml = loaded.as_ref().ok().and_then(Option::as_ref);
    let config = toml.cloned().unwrap_or_default();

    init_tracing(&config.logging)?;

    info!("Starting qfraud-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &loaded {
        Ok(Some(_)) => {
            if let Some(path) = resolver.config_file_path() {
                info!("Configuration file: {}", path.display());
            }
        }
        Ok(None) => info!("No configuration file, using compiled defaults"),
        Err(e) => warn!("Ignoring configuration file: {}", e),
    }

    // Step 1: Resolve root folder
    let root_folder = resolver.resolve_with(toml);
    info!("Root folder: {}", root_folder.display());

    // Step 2: Create root folder directory if missing
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = qfraud_api::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let event_bus = EventBus::new(config.server.event_capacity);
    info!(capacity = config.server.event_capacity, "Event bus initialized");

    let mailer = mailer_from_config(&config.mail.clone().with_env_overrides());

    let state = AppState::new(
        db_pool,
        event_bus,
        &config.training,
        &config.ingest,
        mailer,
    );
    info!(
        workers = state.dispatcher.worker_count(),
        queue_capacity = config.training.queue_capacity,
        "Training workers started"
    );

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    qfraud_api::serve(listener, state, shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. A configured log file gets
/// plain (non-ANSI) output appended to it.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
    }

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
                warn!("Failed to install SIGTERM handler: {}", e);
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

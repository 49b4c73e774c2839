//! qfraud-api library interface
//!
//! Exposes the router, state and services for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod services;
pub mod training;

pub use crate::error::{ApiError, ApiResult};

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use qfraud_common::config::{IngestConfig, TrainingConfig};
use qfraud_common::events::EventBus;
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::{CsvIngestor, JobResultStore, Mailer, TrainingDispatcher, TrainingOrchestrator};
use crate::training::{TrainingBackend, TrainingOptions, VariationalCircuitBackend};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Training notifications, forwarded to `/events` listeners
    pub event_bus: EventBus,
    pub dispatcher: Arc<TrainingDispatcher>,
    /// Latest outcome per project, polled via `/task/:project_name`
    pub results: Arc<JobResultStore>,
    pub ingestor: CsvIngestor,
    pub mailer: Arc<dyn Mailer>,
    /// Cancelled when the server begins shutting down; ends open SSE streams
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State with the default circuit training backend
    ///
    /// Starts the training workers, so it must be called inside a tokio runtime.
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        training: &TrainingConfig,
        ingest: &IngestConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self::with_backend(
            db,
            event_bus,
            training,
            ingest,
            mailer,
            Arc::new(VariationalCircuitBackend::new()),
        )
    }

    pub fn with_backend(
        db: SqlitePool,
        event_bus: EventBus,
        training: &TrainingConfig,
        ingest: &IngestConfig,
        mailer: Arc<dyn Mailer>,
        backend: Arc<dyn TrainingBackend>,
    ) -> Self {
        let ttl = (training.result_ttl_secs > 0).then(|| Duration::from_secs(training.result_ttl_secs));
        let results = Arc::new(JobResultStore::new(ttl, training.max_results));

        let orchestrator = Arc::new(TrainingOrchestrator::new(
            db.clone(),
            event_bus.clone(),
            backend,
            TrainingOptions::from(training),
        ));
        let dispatcher = Arc::new(TrainingDispatcher::start(
            orchestrator,
            Arc::clone(&results),
            event_bus.clone(),
            training.workers,
            training.queue_capacity,
        ));

        Self {
            ingestor: CsvIngestor::new(db.clone(), ingest.chunk_size),
            db,
            event_bus,
            dispatcher,
            results,
            mailer,
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .merge(api::auth_routes())
        .merge(api::upload_routes())
        .merge(api::training_routes())
        .merge(api::record_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `listener` until `signal` resolves
///
/// On the signal, open event streams are ended, in-flight requests are
/// drained and the training workers are stopped before returning.
pub async fn serve<F>(listener: TcpListener, state: AppState, signal: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = state.shutdown.clone();
    let dispatcher = Arc::clone(&state.dispatcher);
    let app = build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            shutdown.cancel();
        })
        .await?;

    dispatcher.shutdown().await;
    Ok(())
}

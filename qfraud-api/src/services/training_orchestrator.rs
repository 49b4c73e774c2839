//! Training orchestrator
//!
//! Loads a project's rows, runs the training backend on a blocking thread
//! while republishing its progress on the event bus, and records the
//! summary once the run succeeds.
//!
//! # Failure semantics
//! Any failure aborts the run before the summary upsert, so a failed run
//! never leaves a partial summary behind.

use crate::db::{summaries, transactions};
use crate::models::summary::STATUS_COMPLETED;
use crate::models::NewProjectSummary;
use crate::training::{TrainingBackend, TrainingError, TrainingOptions, TrainingRequest};
use qfraud_common::events::{EventBus, QfraudEvent, TrainingReport};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

/// Training orchestrator service
pub struct TrainingOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    backend: Arc<dyn TrainingBackend>,
    options: TrainingOptions,
}

impl TrainingOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        backend: Arc<dyn TrainingBackend>,
        options: TrainingOptions,
    ) -> Self {
        Self {
            db,
            event_bus,
            backend,
            options,
        }
    }

    /// Train on every row tagged `project_name` and persist its summary
    pub async fn run(&self, project_name: &str) -> Result<TrainingReport, TrainingError> {
        let started = Instant::now();

        let rows = transactions::load_project_rows(&self.db, project_name).await?;
        if rows.is_empty() {
            return Err(TrainingError::NoData(project_name.to_string()));
        }

        let total_samples = rows.len();
        let fraud_count = rows.iter().filter(|row| row.is_fraud()).count();
        tracing::info!(
            project_name,
            rows = total_samples,
            fraud_count,
            "Training started"
        );

        let backend = Arc::clone(&self.backend);
        let options = self.options.clone();
        let event_bus = self.event_bus.clone();
        let project = project_name.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut publish = |progress: qfraud_common::events::TrainingProgress| {
                tracing::debug!(
                    project_name = %project,
                    epoch = progress.epoch,
                    loss = progress.loss,
                    accuracy = progress.accuracy,
                    "Training progress"
                );
                event_bus.emit_lossy(QfraudEvent::training_progress(project.clone(), progress));
            };
            backend.train(
                TrainingRequest {
                    project_name: &project,
                    rows: &rows,
                    options: &options,
                },
                &mut publish,
            )
        })
        .await
        .map_err(|e| TrainingError::Aborted(e.to_string()))??;

        summaries::upsert_summary(
            &self.db,
            &NewProjectSummary {
                project_name: project_name.to_string(),
                total_samples: total_samples as i64,
                fraud_count: fraud_count as i64,
                accuracy: outcome.accuracy,
                f1_score: outcome.f1_score,
                auc: outcome.auc,
                status: STATUS_COMPLETED.to_string(),
            },
        )
        .await?;

        tracing::info!(
            project_name,
            accuracy = outcome.accuracy,
            f1 = outcome.f1_score,
            auc = outcome.auc,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Training completed"
        );

        Ok(outcome.report)
    }
}

//! Bounded training job dispatcher
//!
//! A fixed pool of worker tasks drains a bounded admission queue. Submitting
//! never waits: when the queue is full the request is refused and the
//! client can retry later. Each worker runs one job at a time to
//! completion, stores the outcome in the `JobResultStore` and publishes the
//! terminal event.
//!
//! Shutdown stops workers from taking new jobs. A job that a worker already
//! took keeps running until it finishes; jobs still queued are dropped.

use crate::services::result_store::{JobOutcome, JobResultStore};
use crate::services::training_orchestrator::TrainingOrchestrator;
use qfraud_common::events::{EventBus, QfraudEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why a job was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Training queue is full, try again later")]
    QueueFull,

    #[error("Training service is shutting down")]
    ShuttingDown,
}

#[derive(Debug)]
struct TrainingJob {
    project_name: String,
}

/// Everything a worker needs to run and report a job
struct WorkerContext {
    orchestrator: Arc<TrainingOrchestrator>,
    results: Arc<JobResultStore>,
    event_bus: EventBus,
}

/// Worker pool plus admission queue
pub struct TrainingDispatcher {
    tx: mpsc::Sender<TrainingJob>,
    shutdown: CancellationToken,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl TrainingDispatcher {
    /// Spawn `worker_count` workers behind a queue of `queue_capacity` jobs
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        orchestrator: Arc<TrainingOrchestrator>,
        results: Arc<JobResultStore>,
        event_bus: EventBus,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let shutdown = CancellationToken::new();
        let context = Arc::new(WorkerContext {
            orchestrator,
            results,
            event_bus,
        });

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&rx),
                    Arc::clone(&context),
                    shutdown.clone(),
                ))
            })
            .collect();

        tracing::info!(
            workers = worker_count,
            queue_capacity = queue_capacity.max(1),
            "Training dispatcher started"
        );

        Self {
            tx,
            shutdown,
            workers: std::sync::Mutex::new(workers),
            worker_count,
        }
    }

    /// Queue a training run for `project_name` without waiting
    pub fn submit(&self, project_name: impl Into<String>) -> Result<(), DispatchError> {
        if self.shutdown.is_cancelled() {
            return Err(DispatchError::ShuttingDown);
        }

        let project_name = project_name.into();
        match self.tx.try_send(TrainingJob {
            project_name: project_name.clone(),
        }) {
            Ok(()) => {
                tracing::info!(project_name = %project_name, "Training job queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(project_name = %project_name, "Training queue full, job refused");
                Err(DispatchError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::ShuttingDown),
        }
    }

    /// Jobs admitted but not yet taken by a worker
    pub fn queued_jobs(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Stop taking jobs and wait for running jobs to finish
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let dropped = self.queued_jobs();
        if dropped > 0 {
            tracing::warn!(dropped, "Discarding queued training jobs on shutdown");
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Training worker ended abnormally");
            }
        }
        tracing::info!("Training dispatcher stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<TrainingJob>>>,
    context: Arc<WorkerContext>,
    shutdown: CancellationToken,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            }
        };

        run_job(worker_id, &context, job).await;
    }
    tracing::debug!(worker_id, "Training worker exiting");
}

async fn run_job(worker_id: usize, context: &WorkerContext, job: TrainingJob) {
    let project_name = job.project_name;
    tracing::info!(worker_id, project_name = %project_name, "Training job started");

    match context.orchestrator.run(&project_name).await {
        Ok(report) => {
            context
                .results
                .insert(project_name.clone(), JobOutcome::Done(Box::new(report.clone())))
                .await;
            context
                .event_bus
                .emit_lossy(QfraudEvent::training_complete(project_name, report));
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(worker_id, project_name = %project_name, error = %message, "Training job failed");
            context
                .results
                .insert(
                    project_name.clone(),
                    JobOutcome::Failed {
                        message: message.clone(),
                    },
                )
                .await;
            context
                .event_bus
                .emit_lossy(QfraudEvent::training_error(project_name, message));
        }
    }
}

//! Event types for the qfraud notification channel
//!
//! Provides the shared event definitions and the `EventBus` used to fan
//! training notifications out to every connected listener.

mod training_types;

pub use training_types::{
    ClassMetrics, ClassificationReport, ReportSummary, RocCurve, TrainingCharts, TrainingProgress,
    TrainingReport,
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// qfraud event types
///
/// Events are broadcast via `EventBus` and serialized for SSE transmission.
/// Every event is scoped to a project tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QfraudEvent {
    /// Per-epoch metrics, and one terminal record flagged `final`
    TrainingProgress {
        project_name: String,
        #[serde(flatten)]
        progress: TrainingProgress,
    },

    /// Training finished and the summary row was written
    TrainingComplete {
        project_name: String,
        status: String,
        results: Box<TrainingReport>,
    },

    /// Training aborted; nothing was persisted
    TrainingError {
        project_name: String,
        status: String,
        message: String,
    },
}

impl QfraudEvent {
    pub fn training_progress(project_name: impl Into<String>, progress: TrainingProgress) -> Self {
        QfraudEvent::TrainingProgress {
            project_name: project_name.into(),
            progress,
        }
    }

    pub fn training_complete(project_name: impl Into<String>, results: TrainingReport) -> Self {
        QfraudEvent::TrainingComplete {
            project_name: project_name.into(),
            status: "success".to_string(),
            results: Box::new(results),
        }
    }

    pub fn training_error(project_name: impl Into<String>, message: impl Into<String>) -> Self {
        QfraudEvent::TrainingError {
            project_name: project_name.into(),
            status: "error".to_string(),
            message: message.into(),
        }
    }

    /// Wire name of the event (SSE `event:` field)
    pub fn event_type(&self) -> &'static str {
        match self {
            QfraudEvent::TrainingProgress { .. } => "training_progress",
            QfraudEvent::TrainingComplete { .. } => "training_complete",
            QfraudEvent::TrainingError { .. } => "training_error",
        }
    }

    /// Project tag the event belongs to
    pub fn project_name(&self) -> &str {
        match self {
            QfraudEvent::TrainingProgress { project_name, .. }
            | QfraudEvent::TrainingComplete { project_name, .. }
            | QfraudEvent::TrainingError { project_name, .. } => project_name,
        }
    }

    /// True for the events after which no more events follow for this run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QfraudEvent::TrainingComplete { .. } | QfraudEvent::TrainingError { .. }
        )
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Backed by `tokio::sync::broadcast`:
/// - Publishing never blocks; it does not wait for listeners
/// - Any number of concurrent subscribers
/// - Each subscriber buffers at most `capacity` events. A subscriber that
///   falls further behind loses the oldest events and is told how many it
///   skipped (`RecvError::Lagged`) on its next receive.
/// - Events from one publisher arrive in publish order
///
/// # Examples
///
/// ```
/// use qfraud_common::events::{EventBus, QfraudEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(QfraudEvent::training_error("demo", "No data found for project: demo"));
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "training_error");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<QfraudEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given per-subscriber buffer
    ///
    /// A zero capacity is raised to one; a broadcast channel needs room for
    /// at least one event.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<QfraudEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to future events, optionally scoped to one project tag
    pub fn subscribe_scoped(&self, project_name: Option<String>) -> ScopedSubscription {
        ScopedSubscription {
            rx: self.tx.subscribe(),
            project_name,
        }
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: QfraudEvent,
    ) -> Result<usize, broadcast::error::SendError<QfraudEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: QfraudEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured per-subscriber buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Receiver that only yields events for one project tag (or all, if unscoped)
pub struct ScopedSubscription {
    rx: broadcast::Receiver<QfraudEvent>,
    project_name: Option<String>,
}

impl ScopedSubscription {
    /// Next matching event
    ///
    /// Lag and closure are reported exactly as by the underlying broadcast
    /// receiver; the caller decides whether to continue after `Lagged`.
    pub async fn recv(&mut self) -> Result<QfraudEvent, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    fn matches(&self, event: &QfraudEvent) -> bool {
        match &self.project_name {
            Some(project) => event.project_name() == project,
            None => true,
        }
    }
}

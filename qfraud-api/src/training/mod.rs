//! Fraud classifier training pipeline
//!
//! The orchestrator only depends on the `TrainingBackend` trait: given the
//! rows of one project it returns metrics, curves and a classification
//! report, and reports each epoch through a callback. The bundled
//! `VariationalCircuitBackend` runs the fixed pipeline:
//!
//! 1. Split rows into a 30-column feature matrix and label vector
//! 2. Oversample minority classes (`smote`) when more than one class and
//!    more than 10 rows are present
//! 3. Standardize (`scaler`)
//! 4. Project onto at most 2 principal components (`pca`)
//! 5. Stratified 80/20 split (`split`)
//! 6. Train a small state-vector circuit classifier (`circuit`) with
//!    mini-batch gradient descent, evaluating on the test set every epoch
//! 7. Final evaluation (`metrics`)
//!
//! All randomness comes from one `StdRng` seeded from `TrainingOptions::seed`,
//! so a given dataset always trains the same way.

pub mod backend;
pub mod circuit;
pub mod dataset;
pub mod metrics;
pub mod pca;
pub mod scaler;
pub mod smote;
pub mod split;

pub use backend::VariationalCircuitBackend;

use crate::models::TransactionRow;
use qfraud_common::config::TrainingConfig;
use qfraud_common::events::{TrainingProgress, TrainingReport};
use thiserror::Error;

/// Dense matrix, one row per sample
pub type Matrix = ndarray::Array2<f64>;

/// Training failures
///
/// None of these reach the start-training response; they become the stored
/// job error and a `training_error` event.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("No data found for project: {0}")]
    NoData(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Database error: {0}")]
    Database(#[from] qfraud_common::Error),

    #[error("Training pipeline failed: {0}")]
    Pipeline(String),

    #[error("Training aborted: {0}")]
    Aborted(String),
}

/// Tunables for one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub max_batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
    pub include_confusion_matrix: bool,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for TrainingOptions {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            epochs: config.epochs,
            max_batch_size: config.max_batch_size,
            learning_rate: config.learning_rate,
            seed: config.seed,
            include_confusion_matrix: config.include_confusion_matrix,
        }
    }
}

/// Input of one training run
#[derive(Debug, Clone, Copy)]
pub struct TrainingRequest<'a> {
    pub project_name: &'a str,
    pub rows: &'a [TransactionRow],
    pub options: &'a TrainingOptions,
}

/// Result of one training run
///
/// The report carries rounded headline numbers; the full-precision final
/// metrics are kept alongside for the persisted summary.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: TrainingReport,
    pub accuracy: f64,
    pub f1_score: f64,
    pub auc: f64,
}

/// A replaceable classifier training implementation
pub trait TrainingBackend: Send + Sync {
    /// Train on `request.rows`, calling `progress` once per epoch and once
    /// more with the terminal (`final`) record
    fn train(
        &self,
        request: TrainingRequest<'_>,
        progress: &mut dyn FnMut(TrainingProgress),
    ) -> Result<TrainingOutcome, TrainingError>;
}

/// Round to `places` decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

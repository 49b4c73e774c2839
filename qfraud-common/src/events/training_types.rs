//! Training payload types shared by events and the result store

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One progress record emitted by the training pipeline
///
/// Per-epoch records carry `duration_sec`; the terminal record has
/// `final = true`, `progress = 100` and a human-readable `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub epoch: usize,
    pub total_epochs: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub f1: f64,
    pub auc: f64,
    /// Percent complete, rounded to 2 decimals
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(rename = "final", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Full result of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub summary: ReportSummary,
    pub charts: TrainingCharts,
    pub classification_report: ClassificationReport,
}

/// Headline numbers of a training run (metrics rounded to 4 decimals)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub project: String,
    pub total_samples: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub f1_score: f64,
    pub roc_auc: f64,
    /// Explained variance ratio of each retained principal component
    pub pca_variance: Vec<f64>,
}

/// Per-epoch curves plus final ROC / confusion matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCharts {
    pub loss_curve: Vec<f64>,
    pub accuracy_curve: Vec<f64>,
    pub f1_curve: Vec<f64>,
    pub auc_curve: Vec<f64>,
    pub roc_curve: RocCurve,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confusion_matrix: Option<Vec<Vec<u64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
}

/// Precision / recall / F1 / support for one label or one average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: f64,
}

/// Classification report keyed like the conventional dictionary form:
/// one entry per label, then `accuracy`, `macro avg` and `weighted avg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    #[serde(flatten)]
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
}

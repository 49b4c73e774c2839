//! Per-project training summaries

use serde::Serialize;

/// Status written when a training run completes
pub const STATUS_COMPLETED: &str = "Completed";

/// Row of the `project_summary` table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectSummary {
    pub id: i64,
    pub project_name: String,
    pub total_samples: Option<i64>,
    pub fraud_count: Option<i64>,
    pub accuracy: Option<f64>,
    pub f1_score: Option<f64>,
    pub auc: Option<f64>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

/// Values written by a completed training run (upserted by project name)
#[derive(Debug, Clone, PartialEq)]
pub struct NewProjectSummary {
    pub project_name: String,
    pub total_samples: i64,
    pub fraud_count: i64,
    pub accuracy: f64,
    pub f1_score: f64,
    pub auc: f64,
    pub status: String,
}

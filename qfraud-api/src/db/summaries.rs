//! Project summary operations
//!
//! One row per project tag; each completed training run replaces it.

use qfraud_common::Result;
use sqlx::SqlitePool;

use crate::models::{NewProjectSummary, ProjectSummary};

const SUMMARY_COLUMNS: &str = "id, project_name, total_samples, fraud_count, accuracy, f1_score, \
     auc, status, CAST(created_at AS TEXT) AS created_at";

/// Insert or replace the summary for `summary.project_name`
///
/// `created_at` is refreshed so the newest run sorts first.
pub async fn upsert_summary(pool: &SqlitePool, summary: &NewProjectSummary) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO project_summary (
            project_name, total_samples, fraud_count, accuracy, f1_score, auc, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(project_name) DO UPDATE SET
            total_samples = excluded.total_samples,
            fraud_count = excluded.fraud_count,
            accuracy = excluded.accuracy,
            f1_score = excluded.f1_score,
            auc = excluded.auc,
            status = excluded.status,
            created_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&summary.project_name)
    .bind(summary.total_samples)
    .bind(summary.fraud_count)
    .bind(summary.accuracy)
    .bind(summary.f1_score)
    .bind(summary.auc)
    .bind(&summary.status)
    .execute(pool)
    .await?;

    Ok(())
}

/// All summaries, newest first
pub async fn list_summaries(pool: &SqlitePool) -> Result<Vec<ProjectSummary>> {
    let query = format!(
        "SELECT {} FROM project_summary ORDER BY created_at DESC, id DESC",
        SUMMARY_COLUMNS
    );
    let summaries = sqlx::query_as::<_, ProjectSummary>(&query)
        .fetch_all(pool)
        .await?;

    Ok(summaries)
}

#[cfg(test)]
pub(crate) async fn get_summary(pool: &SqlitePool, project_name: &str) -> Result<Option<ProjectSummary>> {
    let query = format!(
        "SELECT {} FROM project_summary WHERE project_name = ?",
        SUMMARY_COLUMNS
    );
    let summary = sqlx::query_as::<_, ProjectSummary>(&query)
        .bind(project_name)
        .fetch_optional(pool)
        .await?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::summary::STATUS_COMPLETED;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init_database_pool(&dir.path().join("qfraud.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    fn summary(project: &str, accuracy: f64) -> NewProjectSummary {
        NewProjectSummary {
            project_name: project.to_string(),
            total_samples: 40,
            fraud_count: 20,
            accuracy,
            f1_score: 0.5,
            auc: 0.6,
            status: STATUS_COMPLETED.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let (_dir, pool) = test_pool().await;

        upsert_summary(&pool, &summary("alpha", 0.5)).await.unwrap();
        upsert_summary(&pool, &summary("alpha", 0.75)).await.unwrap();

        let all = list_summaries(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].accuracy, Some(0.75));
        assert_eq!(all[0].status.as_deref(), Some(STATUS_COMPLETED));
        assert!(all[0].created_at.is_some());
    }

    #[tokio::test]
    async fn test_get_summary_by_project() {
        let (_dir, pool) = test_pool().await;

        upsert_summary(&pool, &summary("alpha", 0.5)).await.unwrap();
        upsert_summary(&pool, &summary("beta", 0.9)).await.unwrap();

        let beta = get_summary(&pool, "beta").await.unwrap().unwrap();
        assert_eq!(beta.accuracy, Some(0.9));
        assert!(get_summary(&pool, "gamma").await.unwrap().is_none());
        assert_eq!(list_summaries(&pool).await.unwrap().len(), 2);
    }
}

//! Database access for qfraud-api
//!
//! Single file-backed SQLite database holding credentials, ingested
//! transactions and per-project training summaries.

pub mod summaries;
pub mod transactions;
pub mod users;

use crate::models::transaction::FEATURE_COLUMNS;
use qfraud_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection pool
///
/// Creates the database file (and its parent directory) if missing, then
/// creates any missing tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    tracing::debug!("Connecting to database: {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create `users`, `transactions` and `project_summary` if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Column names follow the CSV header so uploaded files map 1:1
    let feature_columns = FEATURE_COLUMNS
        .iter()
        .map(|column| format!("{} REAL", column))
        .collect::<Vec<_>>()
        .join(",\n            ");
    let create_transactions = format!(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_name TEXT,
            {},
            Class INTEGER
        )
        "#,
        feature_columns
    );
    sqlx::query(&create_transactions).execute(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_project ON transactions(project_name)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_summary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_name TEXT UNIQUE NOT NULL,
            total_samples INTEGER,
            fraud_count INTEGER,
            accuracy REAL,
            f1_score REAL,
            auc REAL,
            status TEXT DEFAULT 'Idle',
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (users, transactions, project_summary)");

    Ok(())
}

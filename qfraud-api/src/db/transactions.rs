//! Transaction table operations

use qfraud_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::models::transaction::{sql_column_list, FEATURE_COLUMNS, FEATURE_COUNT};
use crate::models::{StoredTransaction, TransactionRow};

/// Rows per INSERT statement
///
/// Each row binds 32 parameters; SQLite caps a statement at 32766.
const ROWS_PER_STATEMENT: usize = 1000;

/// Insert one chunk of rows under a project tag
///
/// The chunk is committed as one transaction: either every row of the chunk
/// is stored or none is. Chunks are independent of each other.
pub async fn insert_chunk(
    pool: &SqlitePool,
    project_name: &str,
    rows: &[TransactionRow],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let insert_prefix = format!(
        "INSERT INTO transactions (project_name, {}) ",
        sql_column_list()
    );

    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for statement_rows in rows.chunks(ROWS_PER_STATEMENT) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(&insert_prefix);
        builder.push_values(statement_rows, |mut values, row| {
            values.push_bind(project_name);
            for feature in row.features {
                values.push_bind(feature);
            }
            values.push_bind(row.class);
        });

        let result = builder.build().execute(&mut *tx).await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// All rows for a project tag, in insertion order
pub async fn load_project_rows(pool: &SqlitePool, project_name: &str) -> Result<Vec<TransactionRow>> {
    let query = format!(
        "SELECT id, {} FROM transactions WHERE project_name = ? ORDER BY id",
        sql_column_list()
    );

    let rows = sqlx::query(&query)
        .bind(project_name)
        .fetch_all(pool)
        .await?;

    rows.iter().map(|row| decode_row(row, 1)).collect()
}

/// Row count, optionally restricted to one project tag
pub async fn count_rows(pool: &SqlitePool, project_name: Option<&str>) -> Result<i64> {
    let count: i64 = match project_name {
        Some(project) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE project_name = ?")
                .bind(project)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
                .fetch_one(pool)
                .await?
        }
    };

    Ok(count)
}

/// One page of stored rows, optionally restricted to one project tag
pub async fn list_rows(
    pool: &SqlitePool,
    project_name: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<StoredTransaction>> {
    let columns = sql_column_list();
    let rows = match project_name {
        Some(project) => {
            let query = format!(
                "SELECT id, project_name, {} FROM transactions WHERE project_name = ? ORDER BY id LIMIT ? OFFSET ?",
                columns
            );
            sqlx::query(&query)
                .bind(project)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
        None => {
            let query = format!(
                "SELECT id, project_name, {} FROM transactions ORDER BY id LIMIT ? OFFSET ?",
                columns
            );
            sqlx::query(&query)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter()
        .map(|row| {
            Ok(StoredTransaction {
                id: row.try_get("id")?,
                project_name: row.try_get("project_name")?,
                row: decode_row(row, 2)?,
            })
        })
        .collect()
}

/// Decode the 31 data columns starting at `first_column`
fn decode_row(row: &SqliteRow, first_column: usize) -> Result<TransactionRow> {
    let id: i64 = row.try_get("id")?;
    let mut features = [0.0; FEATURE_COUNT];

    for (i, feature) in features.iter_mut().enumerate() {
        let value: Option<f64> = row.try_get(first_column + i)?;
        *feature = value.ok_or_else(|| {
            Error::Internal(format!(
                "transaction {} has no value for column {}",
                id, FEATURE_COLUMNS[i]
            ))
        })?;
    }

    let class: Option<i64> = row.try_get(first_column + FEATURE_COUNT)?;
    let class = class.ok_or_else(|| {
        Error::Internal(format!("transaction {} has no value for column Class", id))
    })?;

    Ok(TransactionRow { features, class })
}

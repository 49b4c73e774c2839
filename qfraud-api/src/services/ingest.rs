//! CSV ingestion into the transactions table
//!
//! Parsing runs on a blocking thread and hands fixed-size chunks to the
//! async side over a channel of capacity 1, so at most two chunks are in
//! memory at once. Each chunk is validated completely before it is
//! inserted, and committed on its own: a bad chunk stops the upload but
//! chunks committed before it stay in the table.

use crate::db::transactions;
use crate::models::transaction::{required_columns, FEATURE_COUNT, LABEL_COLUMN};
use crate::models::TransactionRow;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Missing columns in CSV: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Invalid value in CSV line {line}, column {column}: {message}")]
    InvalidValue {
        line: u64,
        column: String,
        message: String,
    },

    #[error("Malformed CSV: {0}")]
    Csv(String),

    #[error("Database error: {0}")]
    Database(#[from] qfraud_common::Error),

    #[error("CSV parser stopped unexpectedly: {0}")]
    Aborted(String),
}

impl IngestError {
    /// True for problems with the uploaded file rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::MissingColumns(_) | IngestError::InvalidValue { .. } | IngestError::Csv(_)
        )
    }
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub project_name: String,
    pub rows_inserted: u64,
    pub chunks: usize,
}

/// Streams CSV files into the transactions table
#[derive(Debug, Clone)]
pub struct CsvIngestor {
    db: SqlitePool,
    chunk_size: usize,
}

impl CsvIngestor {
    pub fn new(db: SqlitePool, chunk_size: usize) -> Self {
        Self {
            db,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Ingest every row of `path` under `project_name`
    pub async fn ingest_file(
        &self,
        path: &Path,
        project_name: &str,
    ) -> Result<IngestSummary, IngestError> {
        let (tx, mut rx) = mpsc::channel(1);
        let path: PathBuf = path.to_path_buf();
        let chunk_size = self.chunk_size;

        let parser = tokio::task::spawn_blocking(move || parse_chunks(&path, chunk_size, tx));

        let mut summary = IngestSummary {
            project_name: project_name.to_string(),
            rows_inserted: 0,
            chunks: 0,
        };

        // Returning early drops `rx`, which stops the parser at its next send
        while let Some(chunk) = rx.recv().await {
            let rows = chunk?;
            let inserted = transactions::insert_chunk(&self.db, project_name, &rows).await?;
            summary.rows_inserted += inserted;
            summary.chunks += 1;
            tracing::debug!(
                project_name,
                chunk = summary.chunks,
                rows = inserted,
                "CSV chunk committed"
            );
        }

        parser
            .await
            .map_err(|e| IngestError::Aborted(e.to_string()))?;

        tracing::info!(
            project_name,
            rows = summary.rows_inserted,
            chunks = summary.chunks,
            "CSV ingestion completed"
        );
        Ok(summary)
    }
}

type ChunkSender = mpsc::Sender<Result<Vec<TransactionRow>, IngestError>>;

/// Blocking side: read, validate and send chunks until EOF or first error
fn parse_chunks(path: &Path, chunk_size: usize, tx: ChunkSender) {
    if let Err(e) = read_and_send(path, chunk_size, &tx) {
        // Receiver may already be gone; nothing else to report to
        let _ = tx.blocking_send(Err(e));
    }
}

fn read_and_send(path: &Path, chunk_size: usize, tx: &ChunkSender) -> Result<(), IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| IngestError::Csv(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Csv(e.to_string()))?
        .clone();
    let positions = column_positions(&headers)?;

    let mut chunk = Vec::with_capacity(chunk_size);
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::Csv(e.to_string()))?;
        chunk.push(parse_record(&record, &positions)?);

        if chunk.len() == chunk_size {
            let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
            if tx.blocking_send(Ok(full)).is_err() {
                return Ok(());
            }
        }
    }

    if !chunk.is_empty() {
        let _ = tx.blocking_send(Ok(chunk));
    }
    Ok(())
}

/// Index of each required column in the header, in storage order
fn column_positions(headers: &csv::StringRecord) -> Result<Vec<usize>, IngestError> {
    let mut positions = Vec::with_capacity(FEATURE_COUNT + 1);
    let mut missing = Vec::new();

    for column in required_columns() {
        match headers.iter().position(|h| h == column) {
            Some(index) => positions.push(index),
            None => missing.push(column.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(IngestError::MissingColumns(missing))
    }
}

fn parse_record(record: &csv::StringRecord, positions: &[usize]) -> Result<TransactionRow, IngestError> {
    let line = record.position().map_or(0, |p| p.line());
    let mut features = [0.0; FEATURE_COUNT];

    for ((feature, &index), column) in features.iter_mut().zip(positions).zip(required_columns()) {
        *feature = parse_number(record, index, line, column)?;
    }

    let class_index = positions[FEATURE_COUNT];
    let class_value = parse_number(record, class_index, line, LABEL_COLUMN)?;
    let class = match class_value {
        v if v == 0.0 => 0,
        v if v == 1.0 => 1,
        other => {
            return Err(IngestError::InvalidValue {
                line,
                column: LABEL_COLUMN.to_string(),
                message: format!("expected a binary label (0 or 1), got {}", other),
            })
        }
    };

    Ok(TransactionRow { features, class })
}

fn parse_number(
    record: &csv::StringRecord,
    index: usize,
    line: u64,
    column: &str,
) -> Result<f64, IngestError> {
    let invalid = |message: String| IngestError::InvalidValue {
        line,
        column: column.to_string(),
        message,
    };

    let raw = record
        .get(index)
        .ok_or_else(|| invalid("missing field".to_string()))?;
    if raw.is_empty() {
        return Err(invalid("empty value".to_string()));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid(format!("not a number: {:?}", raw)))?;
    if !value.is_finite() {
        return Err(invalid(format!("not a finite number: {:?}", raw)));
    }
    Ok(value)
}

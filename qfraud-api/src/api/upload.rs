//! CSV upload endpoint
//!
//! The `file` part is streamed to a temporary file so large uploads never
//! sit in memory; the ingestor then reads it chunk by chunk. The temporary
//! file is removed when the handler returns, whatever the outcome.

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    routing::post,
    Json, Router,
};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use super::{non_blank, ApiResponse};
use crate::services::IngestSummary;
use crate::{ApiError, ApiResult, AppState};

/// Largest accepted request body for `/upload_csv`
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// POST /upload_csv
///
/// Multipart fields: `project_name` (text) and `file` (CSV).
pub async fn upload_csv(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ApiResponse<IngestSummary>>> {
    let mut multipart = multipart?;
    let mut project_name: Option<String> = None;
    let mut staged: Option<NamedTempFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("project_name") => project_name = Some(field.text().await?),
            Some("file") => {
                let has_name = field.file_name().is_some_and(|name| !name.is_empty());
                if !has_name {
                    return Err(ApiError::BadRequest("Empty filename".to_string()));
                }
                staged = Some(stage_upload(field).await?);
            }
            _ => {}
        }
    }

    let project_name = non_blank(project_name.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Project name is required.".to_string()))?
        .to_string();
    let staged = staged.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    info!(
        project_name = %project_name,
        path = %staged.path().display(),
        "CSV upload staged"
    );

    let summary = state
        .ingestor
        .ingest_file(staged.path(), &project_name)
        .await?;

    Ok(Json(ApiResponse::message_with_data(
        "CSV data inserted into transactions table",
        summary,
    )))
}

/// Copy a multipart field into a fresh temporary file
async fn stage_upload(mut field: Field<'_>) -> ApiResult<NamedTempFile> {
    let staged = NamedTempFile::new()?;
    let mut out = tokio::fs::File::from_std(staged.reopen()?);

    let mut bytes = 0usize;
    while let Some(chunk) = field.chunk().await? {
        bytes += chunk.len();
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    tracing::debug!(bytes, "Upload written to temporary file");
    Ok(staged)
}

/// Build upload routes
///
/// Replaces axum's 2 MB default body limit with `MAX_UPLOAD_BYTES`.
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload_csv", post(upload_csv))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
}

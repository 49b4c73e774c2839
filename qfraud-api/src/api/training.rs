//! Training job endpoints
//!
//! `GET /train` only admits the job; progress and the terminal event arrive
//! on `/events`, and the final outcome can be polled at `/task/:project_name`.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{non_blank, ApiResponse};
use crate::services::JobOutcome;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct TrainQuery {
    pub project_name: Option<String>,
}

/// Polling view of one project's latest job
#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub project_name: String,
    /// "pending" until an outcome is stored, then "done"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutcome>,
}

/// GET /train?project_name=
pub async fn start_training(
    State(state): State<AppState>,
    query: Result<Query<TrainQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<()>>)> {
    let Query(query) = query?;
    let project_name = non_blank(query.project_name.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Project name is required".to_string()))?;

    state.dispatcher.submit(project_name)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::message(format!(
            "Training started for {}",
            project_name
        ))),
    ))
}

/// GET /task/:project_name
pub async fn task_status(
    State(state): State<AppState>,
    Path(project_name): Path<String>,
) -> Json<TaskStatusResponse> {
    let result = state.results.get(&project_name).await;
    let status = if result.is_some() { "done" } else { "pending" };

    Json(TaskStatusResponse {
        project_name,
        status,
        result,
    })
}

/// Build training routes
pub fn training_routes() -> Router<AppState> {
    Router::new()
        .route("/train", get(start_training))
        .route("/task/:project_name", get(task_status))
}

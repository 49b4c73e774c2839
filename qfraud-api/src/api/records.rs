//! Read-only views of stored data: project summaries, users, transactions

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{non_blank, ApiResponse};
use crate::db::{summaries, transactions, users};
use crate::models::{ProjectSummary, StoredTransaction, UserProfile};
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub project_name: Option<String>,
    pub page: Option<i64>,
}

/// One page of `GET /view_transactions`
#[derive(Debug, Serialize)]
pub struct TransactionsPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub page: i64,
    pub page_size: i64,
    pub total_rows: i64,
    pub total_pages: i64,
    pub rows: Vec<StoredTransaction>,
}

/// GET /projects
///
/// Most recently trained first.
pub async fn list_projects(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<ProjectSummary>>>> {
    let projects = summaries::list_summaries(&state.db).await?;
    Ok(Json(ApiResponse::data(projects)))
}

/// GET /view-users
pub async fn view_users(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<UserProfile>>>> {
    let users = users::list_users(&state.db).await?;
    Ok(Json(ApiResponse::data(users)))
}

/// GET /view_transactions?project_name=&page=
pub async fn view_transactions(
    State(state): State<AppState>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<TransactionsPage>>> {
    let Query(query) = query?;
    let project_name = non_blank(query.project_name.as_deref()).map(str::to_string);

    let total_rows = transactions::count_rows(&state.db, project_name.as_deref()).await?;
    let pagination = calculate_pagination(total_rows, query.page.unwrap_or(1));
    let rows = transactions::list_rows(
        &state.db,
        project_name.as_deref(),
        PAGE_SIZE,
        pagination.offset,
    )
    .await?;

    Ok(Json(ApiResponse::data(TransactionsPage {
        project_name,
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_rows,
        total_pages: pagination.total_pages,
        rows,
    })))
}

/// Build read-only routes
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/view-users", get(view_users))
        .route("/view_transactions", get(view_transactions))
}

//! Server-Sent Events endpoint for training notifications

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use qfraud_common::sse::create_event_sse_stream;
use serde::Deserialize;

use super::non_blank;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only forward events for this project; all projects when absent
    pub project_name: Option<String>,
}

/// GET /events?project_name=
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let scope = non_blank(query.project_name.as_deref()).map(str::to_string);
    create_event_sse_stream(
        "qfraud-api",
        state.event_bus.subscribe_scoped(scope),
        state.shutdown.clone(),
    )
}

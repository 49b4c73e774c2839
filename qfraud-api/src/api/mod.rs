//! HTTP API handlers for qfraud-api
//!
//! Every successful JSON response uses the envelope
//! `{"status":"success","message"?,"data"?}`; failures go through `ApiError`.

pub mod auth;
pub mod health;
pub mod records;
pub mod sse;
pub mod training;
pub mod upload;

pub use auth::auth_routes;
pub use health::health_routes;
pub use records::record_routes;
pub use sse::event_stream;
pub use training::training_routes;
pub use upload::upload_routes;

use serde::Serialize;

/// Success envelope shared by the JSON endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data: Some(data),
        }
    }

    pub fn message_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data: None,
        }
    }
}

/// GET /
pub async fn index() -> &'static str {
    "qfraud-api: transaction fraud training service"
}

/// Trimmed value of an optional text field, `None` when blank
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

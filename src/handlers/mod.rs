pub mod ingest;
pub mod metrics;
pub mod retrieve;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::record::ValidationError;
use crate::store::StoreError;

/// Greeting carried by every successful response.
pub const ACCESS_GRANTED: &str = "Access granted!";

pub const INVALID_DATE_FORMAT: &str = "Invalid date format, correct format is: \
     YYYY-MM-DD hh:mm:ss (example: date_from=2024-01-05 13:25:12)";

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", INVALID_DATE_FORMAT)]
    InvalidDateFormat,
    #[error("Invalid or missing API Key")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidDateFormat => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = serde_json::json!({
            "error":  self.to_string(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

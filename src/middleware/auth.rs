use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::handlers::AppError;
use crate::AppState;

/// Header carrying the caller's credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `x-api-key` is absent or not registered.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| state.api_keys.contains(key));

    if !authorized {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(req).await)
}

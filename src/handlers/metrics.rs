use axum::{extract::State, Json};
use std::sync::Arc;

use crate::metrics::MetricsSnapshot;
use crate::AppState;

// ─── GET /api/v1/metrics ─────────────────────────────────────────

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::StoreTime;
use crate::query::{logs_pipeline, statistics_pipeline, Document};
use crate::record::TimeRange;
use crate::AppState;

use super::{AppError, ACCESS_GRANTED};

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
    pub date_from: String,
    pub date_to: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub message: &'static str,
    pub statistics: Vec<Document>,
    pub logs: Vec<Document>,
    pub status_code: u16,
}

// ─── GET /api/v1/retrieve ────────────────────────────────────────

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RetrieveParams>,
) -> Result<(Extension<StoreTime>, Json<RetrieveResponse>), AppError> {
    let range = TimeRange::parse(&params.date_from, &params.date_to)
        .map_err(|_| AppError::InvalidDateFormat)?;
    let stats_query = statistics_pipeline(range);
    let logs_query = logs_pipeline(range);

    // ── Store READ (one scan shared by both pipelines) ──────────
    let t_store = Instant::now();
    let mut results = state
        .store
        .aggregate_all(&[&stats_query, &logs_query])
        .await?
        .into_iter();
    let store_time = StoreTime(t_store.elapsed().as_micros() as u64);
    // ────────────────────────────────────────────────────────────

    let statistics = results.next().unwrap_or_default();
    let logs = results.next().unwrap_or_default();

    Ok((
        Extension(store_time),
        Json(RetrieveResponse {
            message: ACCESS_GRANTED,
            statistics,
            logs,
            status_code: 200,
        }),
    ))
}

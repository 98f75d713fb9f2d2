use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::StoreTime;
use crate::record::{IngestRequest, Record};
use crate::synth::synthesize;
use crate::AppState;

use super::{AppError, ACCESS_GRANTED};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: &'static str,
    /// The stored record, synthesized fields included
    pub payload: Record,
}

// ─── POST /api/v1/ingest ─────────────────────────────────────────

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<(Extension<StoreTime>, Json<IngestResponse>), AppError> {
    let record = synthesize(req.validate()?, &mut rand::thread_rng(), Utc::now());

    // ── Store WRITE ─────────────────────────────────────────────
    let t_store = Instant::now();
    state.store.insert(&record).await?;
    let store_time = StoreTime(t_store.elapsed().as_micros() as u64);
    // ────────────────────────────────────────────────────────────

    tracing::debug!(key = record.key, code = record.response_code, "record ingested");

    Ok((
        Extension(store_time),
        Json(IngestResponse {
            message: ACCESS_GRANTED,
            payload: record,
        }),
    ))
}

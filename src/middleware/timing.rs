use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{Operation, Sample, StoreTime};
use crate::AppState;

/// Times every request and feeds ingest/retrieve samples to the
/// metrics collector.
///
/// Sets `X-Response-Time-Us` and a `Server-Timing` header that splits
/// out store time when the handler reported one. Requests rejected by
/// the API-key check are not sampled.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let total_us = start.elapsed().as_micros() as u64;

    let status = response.status();
    let store_us = response.extensions().get::<StoreTime>().map(|t| t.0);

    if let Some(op) = Operation::from_path(&path) {
        if status != StatusCode::UNAUTHORIZED {
            state.metrics.record(Sample {
                op,
                store_us: store_us.unwrap_or(0),
                total_us,
                success: status.is_success(),
            });
        }
    }

    let headers = response.headers_mut();
    headers.insert("X-Response-Time-Us", HeaderValue::from(total_us));
    if let Ok(val) = HeaderValue::from_str(&server_timing(store_us, total_us)) {
        headers.insert("Server-Timing", val);
    }

    if path.starts_with("/api/") {
        tracing::info!(
            %method,
            %path,
            status = status.as_u16(),
            total_us,
            store_us = store_us.unwrap_or(0),
            "request"
        );
    }

    response
}

fn server_timing(store_us: Option<u64>, total_us: u64) -> String {
    let ms = |us: u64| us as f64 / 1000.0;
    match store_us {
        Some(store) => format!("store;dur={:.3}, total;dur={:.3}", ms(store), ms(total_us)),
        None => format!("total;dur={:.3}", ms(total_us)),
    }
}

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::{auth, timing};
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/retrieve", get(handlers::retrieve::retrieve))
        .route("/api/v1/ingest", post(handlers::ingest::ingest))
        .route("/api/v1/metrics", get(handlers::metrics::get_metrics))
        // ── Every route above requires a registered key ─────────
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(state, timing::track_requests))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsCollector;
    use crate::query::builder::LOGS_LIMIT;
    use crate::record::Record;
    use crate::store::{MemoryStore, RecordStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    fn state_with(store: Arc<dyn RecordStore>) -> Arc<AppState> {
        Arc::new(AppState {
            store,
            metrics: Arc::new(MetricsCollector::new()),
            api_keys: HashSet::from([KEY.to_string()]),
        })
    }

    fn state() -> Arc<AppState> {
        state_with(Arc::new(MemoryStore::new()))
    }

    async fn send(router: Router, req: Request<Body>) -> Response {
        match router.oneshot(req).await {
            Ok(response) => response,
            Err(err) => panic!("router request failed: {err}"),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn ingest_req(key: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/ingest")
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn retrieve_req(query: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/v1/retrieve?{query}"))
            .header("x-api-key", KEY)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn missing_or_unknown_key_is_unauthorized() {
        let body = serde_json::json!({"key": 1, "payload": "0123456789"});
        for key in [None, Some("nope")] {
            let response = send(create_router(state()), ingest_req(key, body.clone())).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let json = body_json(response).await;
            assert_eq!(json["error"], "Invalid or missing API Key");
            assert_eq!(json["status"], 401);
        }
    }

    #[tokio::test]
    async fn ingest_returns_synthesized_record() {
        let store = Arc::new(MemoryStore::new());
        let router = create_router(state_with(store.clone()));
        let body = serde_json::json!({"key": 3, "payload": "latency probe ok"});

        let response = send(router, ingest_req(Some(KEY), body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-Response-Time-Us"));

        let json = body_json(response).await;
        assert_eq!(json["message"], "Access granted!");
        let record: Record = serde_json::from_value(json["payload"].clone()).unwrap();
        assert_eq!(record.key, 3);
        assert_eq!(record.payload, "latency probe ok");
        assert!((10..50).contains(&record.response_time));
        assert!([200, 500].contains(&record.response_code));
        assert_eq!(store.scan(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ingest_rejects_out_of_bounds_input() {
        let store = Arc::new(MemoryStore::new());
        for body in [
            serde_json::json!({"key": 7, "payload": "0123456789"}),
            serde_json::json!({"key": 1, "payload": "too short"}),
        ] {
            let router = create_router(state_with(store.clone()));
            let response = send(router, ingest_req(Some(KEY), body)).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert!(store.scan(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrieve_rejects_bad_format() {
        let response = send(
            create_router(state()),
            retrieve_req("date_from=2024/01/05&date_to=2024-01-05%2014:00:00"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("YYYY-MM-DD hh:mm:ss (example: date_from=2024-01-05 13:25:12)"));
    }

    #[tokio::test]
    async fn retrieve_rejects_loosely_formatted_bounds() {
        // missing separator, leading space, signed year
        for from in [
            "2024-01-0513:25:12",
            "%202024-01-05%2013:25:12",
            "%2B2024-01-05%2013:25:12",
        ] {
            let query = format!("date_from={from}&date_to=2024-01-05%2014:00:00");
            let response = send(create_router(state()), retrieve_req(&query)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "date_from={from}");
        }
    }

    #[tokio::test]
    async fn retrieve_requires_both_bounds() {
        let response = send(
            create_router(state()),
            retrieve_req("date_from=2024-01-05%2013:00:00"),
        )
        .await;
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn retrieve_returns_statistics_and_logs() {
        let store = Arc::new(MemoryStore::new());
        let base = Utc.with_ymd_and_hms(2024, 1, 5, 13, 0, 0).unwrap();
        for i in 0..12u32 {
            store
                .insert(&Record {
                    key: (i % 2 + 1) as u8,
                    payload: format!("record number {i}"),
                    response_time: 10 + i,
                    response_code: if i == 4 { 500 } else { 200 },
                    time: base + Duration::seconds(i as i64 * 10),
                })
                .await
                .unwrap();
        }
        let router = create_router(state_with(store));

        let response = send(
            router,
            retrieve_req("date_from=2024-01-05+13:00:00&date_to=2024-01-05+14:00:00"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Access granted!");
        assert_eq!(json["status_code"], 200);

        // 0..60s in minute 13:00, 60..110s in minute 13:01
        let stats = json["statistics"].as_array().unwrap();
        let rows: Vec<(i64, &str, i64, i64)> = stats
            .iter()
            .map(|r| {
                (
                    r["key"].as_i64().unwrap(),
                    r["creation_datetime"].as_str().unwrap(),
                    r["total_requests"].as_i64().unwrap(),
                    r["total_errors"].as_i64().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                (1, "2024-01-05 13:00:00", 3, 1),
                (1, "2024-01-05 13:01:00", 3, 0),
                (2, "2024-01-05 13:00:00", 3, 0),
                (2, "2024-01-05 13:01:00", 3, 0),
            ]
        );
        // key 1 in minute 13:00: i = 0, 2, 4
        assert_eq!(stats[0]["total_response_time_ms"], 10 + 12 + 14);

        let logs = json["logs"].as_array().unwrap();
        assert_eq!(logs.len(), LOGS_LIMIT);
        assert_eq!(logs[0]["creation_datetime"], "2024-01-05 13:01:50.000000");
        assert_eq!(logs[0]["payload"], "record number 11");
        assert!(logs[0].get("time").is_none());
    }

    #[tokio::test]
    async fn metrics_count_requests() {
        let state = state();
        let body = serde_json::json!({"key": 2, "payload": "metrics payload"});
        let rejected = send(create_router(state.clone()), ingest_req(None, body.clone())).await;
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let accepted = send(create_router(state.clone()), ingest_req(Some(KEY), body)).await;
        let timing = accepted.headers()["Server-Timing"].to_str().unwrap().to_owned();
        assert!(timing.starts_with("store;dur="), "{timing}");
        send(
            create_router(state.clone()),
            retrieve_req("date_from=bad&date_to=bad"),
        )
        .await;

        let response = send(
            create_router(state),
            Request::builder()
                .uri("/api/v1/metrics")
                .header("x-api-key", KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ingest"]["requests"], 1);
        assert_eq!(json["ingest"]["store"]["count"], 1);
        assert_eq!(json["ingest"]["e2e"]["count"], 1);
        assert_eq!(json["retrieve"]["errors"], 1);
        assert_eq!(json["total_requests"], 2);
    }
}

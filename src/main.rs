use std::collections::HashSet;
use std::process;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

mod config;
mod handlers;
mod metrics;
mod middleware;
mod query;
mod record;
mod seed;
mod server;
mod store;
mod synth;

use config::{AppConfig, ConfigError};
use seed::SeedError;
use store::{RecordStore, StoreError};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Record store; Redis in production, in-memory for tests.
    pub store: Arc<dyn RecordStore>,

    /// Per-endpoint latency histograms.
    pub metrics: Arc<metrics::MetricsCollector>,

    /// Credentials accepted in the `x-api-key` header.
    pub api_keys: HashSet<String>,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("record store: {0}")]
    Store(#[from] StoreError),
    #[error("seeding: {0}")]
    Seed(#[from] SeedError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("telemetry-api failed: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    // ── 1. Connect to the record store ──────────────────────────
    let store: Arc<dyn RecordStore> = store::connect(&config).await?.into();
    tracing::info!(backend = store.backend(), "record store ready");

    // ── 2. Seed demo history ────────────────────────────────────
    seed::seed(store.as_ref(), config.seed_records, Utc::now()).await?;

    // ── 3. Build shared state ───────────────────────────────────
    let state = Arc::new(AppState {
        store,
        metrics: Arc::new(metrics::MetricsCollector::new()),
        api_keys: config.api_keys.clone(),
    });

    // ── 4. Bind & serve ─────────────────────────────────────────
    let app = server::create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        api_keys = config.api_keys.len(),
        "telemetry-api listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

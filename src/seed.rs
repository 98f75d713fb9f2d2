use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Instant;

use crate::record::{IngestRequest, Record, ValidationError};
use crate::store::{RecordStore, StoreError};
use crate::synth::synthesize;

/// Seeded history covers this much time before startup.
const SEED_WINDOW_SECS: i64 = 3600;

// ─── Payload pools ───────────────────────────────────────────────

static SERVICES: &[&str] = &[
    "checkout", "search", "auth", "billing", "catalog", "inventory", "gateway", "profile",
];

static EVENTS: &[&str] = &[
    "request completed",
    "cache miss",
    "upstream retry",
    "slow query",
    "token refreshed",
    "batch flushed",
    "connection reused",
    "payload validated",
];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("generated invalid record: {0}")]
    Invalid(#[from] ValidationError),
}

/// Insert `count` records spread over the hour before `now`.
///
/// Uses a fixed-seed RNG so every run produces the same history.
pub async fn seed(store: &dyn RecordStore, count: usize, now: DateTime<Utc>) -> Result<(), SeedError> {
    if count == 0 {
        return Ok(());
    }
    let start = Instant::now();
    tracing::info!(count, backend = store.backend(), "seeding records");

    let mut rng = StdRng::seed_from_u64(42);
    for record in generate(&mut rng, count, now)? {
        store.insert(&record).await?;
    }

    tracing::info!(
        count,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "seed complete"
    );
    Ok(())
}

fn generate(rng: &mut StdRng, count: usize, now: DateTime<Utc>) -> Result<Vec<Record>, SeedError> {
    (0..count)
        .map(|i| {
            let service = SERVICES.choose(rng).copied().unwrap_or("gateway");
            let event = EVENTS.choose(rng).copied().unwrap_or("request completed");
            let req = IngestRequest {
                key: (i % 6) as i64 + 1,
                payload: format!("{service}: {event} #{i}"),
            }
            .validate()?;

            let offset = Duration::milliseconds(rng.gen_range(1..=SEED_WINDOW_SECS * 1000));
            Ok::<_, SeedError>(synthesize(req, rng, now - offset))
        })
        .collect()
}

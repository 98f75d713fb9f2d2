use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;

use crate::record::{Record, ValidIngest};

/// Simulated latency, uniform over this range (ms).
pub const RESPONSE_TIME_MS: Range<u32> = 10..50;

/// Simulated outcomes with their relative weights.
const RESPONSE_CODES: [(u16, u32); 2] = [(200, 90), (500, 10)];

/// Build a storable record from a validated request.
///
/// Latency and outcome are drawn from `rng`; `now` becomes the record's
/// `time`. Callers pass the thread RNG and `Utc::now()` in production.
pub fn synthesize<R: Rng + ?Sized>(req: ValidIngest, rng: &mut R, now: DateTime<Utc>) -> Record {
    let (key, payload) = req.into_parts();
    Record {
        key,
        payload,
        response_time: rng.gen_range(RESPONSE_TIME_MS),
        response_code: response_code(rng),
        time: now,
    }
}

fn response_code<R: Rng + ?Sized>(rng: &mut R) -> u16 {
    RESPONSE_CODES
        .choose_weighted(rng, |&(_, weight)| weight)
        .map(|&(code, _)| code)
        .unwrap_or(200)
}

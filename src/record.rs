use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

// ─── Constants ───────────────────────────────────────────────────

/// Valid logical source channels.
pub const KEY_RANGE: RangeInclusive<i64> = 1..=6;

/// Payload length bounds, counted in characters.
pub const PAYLOAD_LEN: RangeInclusive<usize> = 10..=255;

/// The only accepted textual form of a range boundary.
pub const RANGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serialized form of a stored `time` value.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Minute-bucket rendering used as a statistics group key.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M:00";

// ─── Domain types ────────────────────────────────────────────────

/// A single persisted ingestion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: u8,
    pub payload: String,
    /// Simulated latency in milliseconds
    pub response_time: u32,
    /// Simulated outcome, 200 or 500
    pub response_code: u16,
    #[serde(with = "time_format")]
    pub time: DateTime<Utc>,
}

/// Body of `POST /api/v1/ingest`, before bounds checking.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub key: i64,
    pub payload: String,
}

/// An ingest request whose key and payload are known to be in bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidIngest {
    key: u8,
    payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("key must be between 1 and 6, got {0}")]
    KeyOutOfRange(i64),
    #[error("payload must be between 10 and 255 characters, got {0}")]
    PayloadLength(usize),
}

impl IngestRequest {
    pub fn validate(self) -> Result<ValidIngest, ValidationError> {
        if !KEY_RANGE.contains(&self.key) {
            return Err(ValidationError::KeyOutOfRange(self.key));
        }
        let len = self.payload.chars().count();
        if !PAYLOAD_LEN.contains(&len) {
            return Err(ValidationError::PayloadLength(len));
        }
        Ok(ValidIngest {
            key: self.key as u8,
            payload: self.payload,
        })
    }
}

impl ValidIngest {
    pub fn into_parts(self) -> (u8, String) {
        (self.key, self.payload)
    }
}

// ─── Time range ──────────────────────────────────────────────────

/// Half-open interval `[from, to)` over the `time` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(with = "time_format")]
    pub from: DateTime<Utc>,
    #[serde(with = "time_format")]
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp '{0}', expected YYYY-MM-DD hh:mm:ss")]
pub struct TimeFormatError(pub String);

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Parse both boundaries with [`RANGE_FORMAT`], interpreted as UTC.
    pub fn parse(from: &str, to: &str) -> Result<Self, TimeFormatError> {
        Ok(Self::new(parse_boundary(from)?, parse_boundary(to)?))
    }

    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        self.from <= *t && *t < self.to
    }
}

/// Byte layout of `YYYY-MM-DD hh:mm:ss`; `d` marks an ASCII digit.
const RANGE_SHAPE: &[u8; 19] = b"dddd-dd-dd dd:dd:dd";

/// chrono lets a pattern space match any run of whitespace and `%Y` take
/// a sign, so the exact layout is checked first.
fn has_range_shape(raw: &str) -> bool {
    raw.len() == RANGE_SHAPE.len()
        && raw.bytes().zip(RANGE_SHAPE).all(|(b, &want)| match want {
            b'd' => b.is_ascii_digit(),
            sep => b == sep,
        })
}

fn parse_boundary(raw: &str) -> Result<DateTime<Utc>, TimeFormatError> {
    if !has_range_shape(raw) {
        return Err(TimeFormatError(raw.to_owned()));
    }
    NaiveDateTime::parse_from_str(raw, RANGE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| TimeFormatError(raw.to_owned()))
}

/// Truncate to the containing whole minute and render it.
pub fn minute_bucket(t: &DateTime<Utc>) -> String {
    t.format(MINUTE_FORMAT).to_string()
}

/// Serde adapter for `DateTime<Utc>` in [`TIME_FORMAT`].
pub mod time_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}

// ─── Tests ───────────────────────────────────────────────────────

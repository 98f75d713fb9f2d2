pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};

/// Which endpoint a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ingest,
    Retrieve,
}

impl Operation {
    /// Endpoints whose latency is tracked; other paths are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/api/v1/ingest" => Some(Operation::Ingest),
            "/api/v1/retrieve" => Some(Operation::Retrieve),
            _ => None,
        }
    }
}

/// Microseconds a handler spent waiting on the record store.
///
/// Handlers attach it as a response extension; the timing middleware
/// reads it back when recording the [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTime(pub u64);

/// A single timing observation.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub op: Operation,
    pub store_us: u64,
    /// Total wall time inside the middleware stack
    pub total_us: u64,
    /// false for any non-2xx response
    pub success: bool,
}

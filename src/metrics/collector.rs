use std::time::Instant;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::{Operation, Sample};

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

/// Thread-safe request metrics.
/// The timing middleware calls `record()`, `GET /api/v1/metrics` calls `snapshot()`.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

/// Latency quantiles of one histogram, in microseconds.
///
/// All zero until the first successful request lands.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub mean_us: f64,
    pub min_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl From<&Histogram<u64>> for LatencySummary {
    fn from(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::default();
        }
        Self {
            count: hist.len(),
            mean_us: hist.mean(),
            min_us: hist.min(),
            p50_us: hist.value_at_quantile(0.50),
            p95_us: hist.value_at_quantile(0.95),
            p99_us: hist.value_at_quantile(0.99),
            max_us: hist.max(),
        }
    }
}

/// Latency of one endpoint, split into store time and end-to-end time.
#[derive(Debug, Clone, Serialize)]
pub struct OperationStats {
    pub store: LatencySummary,
    pub e2e: LatencySummary,
    pub requests: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub ingest: OperationStats,
    pub retrieve: OperationStats,
    pub total_requests: u64,
    pub total_errors: u64,
    pub requests_per_sec: f64,
    pub uptime_secs: f64,
}

struct Inner {
    ingest: OperationHists,
    retrieve: OperationHists,
    started: Instant,
}

struct OperationHists {
    store: Histogram<u64>,
    e2e: Histogram<u64>,
    requests: u64,
    errors: u64,
}

fn histogram() -> Histogram<u64> {
    Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
        .expect("histogram bounds are valid constants")
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ingest: OperationHists::new(),
                retrieve: OperationHists::new(),
                started: Instant::now(),
            }),
        }
    }

    pub fn record(&self, sample: Sample) {
        let mut inner = self.inner.lock();
        let hists = match sample.op {
            Operation::Ingest => &mut inner.ingest,
            Operation::Retrieve => &mut inner.retrieve,
        };
        hists.record(&sample);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        let uptime_secs = inner.started.elapsed().as_secs_f64();
        let total_requests = inner.ingest.requests + inner.retrieve.requests;
        let total_errors = inner.ingest.errors + inner.retrieve.errors;

        MetricsSnapshot {
            ingest: inner.ingest.stats(),
            retrieve: inner.retrieve.stats(),
            total_requests,
            total_errors,
            requests_per_sec: if uptime_secs > 0.0 {
                total_requests as f64 / uptime_secs
            } else {
                0.0
            },
            uptime_secs,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationHists {
    fn new() -> Self {
        Self {
            store: histogram(),
            e2e: histogram(),
            requests: 0,
            errors: 0,
        }
    }

    fn record(&mut self, sample: &Sample) {
        self.requests += 1;
        if !sample.success {
            self.errors += 1;
            return;
        }
        // Clamp to the histogram's lower bound
        let _ = self.store.record(sample.store_us.max(HIST_LOW));
        let _ = self.e2e.record(sample.total_us.max(HIST_LOW));
    }

    fn stats(&self) -> OperationStats {
        OperationStats {
            store: LatencySummary::from(&self.store),
            e2e: LatencySummary::from(&self.e2e),
            requests: self.requests,
            errors: self.errors,
        }
    }
}

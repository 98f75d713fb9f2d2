use super::pipeline::{Accumulator, AccumulatorOp, GroupKey, Pipeline, Projection, SortKey, Stage};
use crate::record::TimeRange;

/// Maximum number of log entries returned per retrieval.
pub const LOGS_LIMIT: usize = 10;

const ERROR_CODE: i64 = 500;

fn match_time(range: TimeRange) -> Stage {
    Stage::Match {
        field: "time".into(),
        range,
    }
}

/// Per-minute rollup for each key in `[from, to)`.
///
/// Rows: `{key, total_response_time_ms, total_requests, total_errors,
/// creation_datetime}`, sorted by key, then minute.
pub fn statistics_pipeline(range: TimeRange) -> Pipeline {
    Pipeline::new(vec![
        match_time(range),
        Stage::Group {
            by: vec![
                GroupKey::Field {
                    name: "key".into(),
                    field: "key".into(),
                },
                GroupKey::MinuteOf {
                    name: "minute".into(),
                    field: "time".into(),
                },
            ],
            accumulators: vec![
                Accumulator::new(
                    "total_response_time_ms",
                    AccumulatorOp::Sum("response_time".into()),
                ),
                Accumulator::new("total_requests", AccumulatorOp::Count),
                Accumulator::new(
                    "total_errors",
                    AccumulatorOp::CountEq {
                        field: "response_code".into(),
                        value: ERROR_CODE,
                    },
                ),
            ],
        },
        Stage::Project(vec![
            Projection::keep("key"),
            Projection::keep("total_response_time_ms"),
            Projection::keep("total_requests"),
            Projection::keep("total_errors"),
            Projection::rename("creation_datetime", "minute"),
        ]),
        Stage::Sort(vec![SortKey::asc("key"), SortKey::asc("creation_datetime")]),
    ])
}

/// The most recent [`LOGS_LIMIT`] records in `[from, to)`, newest first.
pub fn logs_pipeline(range: TimeRange) -> Pipeline {
    Pipeline::new(vec![
        match_time(range),
        Stage::Sort(vec![SortKey::desc("time")]),
        Stage::Limit(LOGS_LIMIT),
        Stage::Project(vec![
            Projection::keep("key"),
            Projection::keep("payload"),
            Projection::keep("response_time"),
            Projection::keep("response_code"),
            Projection::rename("creation_datetime", "time"),
        ]),
    ])
}

//! Declarative aggregation pipelines over stored records.
//!
//! `builder` turns a time range into the two retrieval pipelines,
//! `pipeline` holds the stage types and an in-process executor, and
//! `document` is the field map both operate on.

pub mod builder;
pub mod document;
pub mod pipeline;

pub use builder::{logs_pipeline, statistics_pipeline};
pub use document::Document;
pub use pipeline::Pipeline;

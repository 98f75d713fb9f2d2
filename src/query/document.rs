use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::record::{Record, TIME_FORMAT};

/// A field map the pipeline engine operates on.
pub type Document = BTreeMap<String, Value>;

/// A single field value.
///
/// Ordering is by kind first (`Int < Str < Time`), then by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Int(i64),
    Str(String),
    Time(DateTime<Utc>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Time(v) => Some(v),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => s.serialize_i64(*v),
            Value::Str(v) => s.serialize_str(v),
            Value::Time(v) => s.collect_str(&v.format(TIME_FORMAT)),
        }
    }
}

impl From<Record> for Document {
    fn from(record: Record) -> Self {
        BTreeMap::from([
            ("key".to_owned(), Value::Int(record.key.into())),
            ("payload".to_owned(), Value::Str(record.payload)),
            ("response_time".to_owned(), Value::Int(record.response_time.into())),
            ("response_code".to_owned(), Value::Int(record.response_code.into())),
            ("time".to_owned(), Value::Time(record.time)),
        ])
    }
}

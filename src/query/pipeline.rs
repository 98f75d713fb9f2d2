use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::document::{Document, Value};
use crate::record::{minute_bucket, TimeRange};

// ─── Stage definitions ───────────────────────────────────────────

/// An ordered list of stages, built once and executed by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Keep documents whose timestamp `field` falls in `range`.
    Match { field: String, range: TimeRange },
    /// One output document per distinct key tuple.
    Group {
        by: Vec<GroupKey>,
        accumulators: Vec<Accumulator>,
    },
    /// Rebuild each document from exactly these fields.
    Project(Vec<Projection>),
    Sort(Vec<SortKey>),
    Limit(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GroupKey {
    /// Copy `field` as-is into `name`.
    Field { name: String, field: String },
    /// Minute bucket of timestamp `field`, rendered as a string.
    MinuteOf { name: String, field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accumulator {
    pub name: String,
    pub op: AccumulatorOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulatorOp {
    /// Sum of an integer field; non-integers count as zero.
    Sum(String),
    Count,
    /// Number of documents whose `field` equals `value`.
    CountEq { field: String, value: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

// ─── Constructors ────────────────────────────────────────────────

impl Projection {
    pub fn keep(field: &str) -> Self {
        Self::rename(field, field)
    }

    pub fn rename(name: &str, source: &str) -> Self {
        Self {
            name: name.to_owned(),
            source: source.to_owned(),
        }
    }
}

impl SortKey {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            order: SortOrder::Desc,
        }
    }
}

impl Accumulator {
    pub fn new(name: &str, op: AccumulatorOp) -> Self {
        Self {
            name: name.to_owned(),
            op,
        }
    }
}

// ─── Execution ───────────────────────────────────────────────────

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Range of a leading `Match` stage, which a store may answer from
    /// its own time index before running the pipeline.
    pub fn leading_range(&self) -> Option<&TimeRange> {
        match self.stages.first() {
            Some(Stage::Match { range, .. }) => Some(range),
            _ => None,
        }
    }

    /// Apply every stage in order.
    pub fn run<I>(&self, docs: I) -> Vec<Document>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut docs: Vec<Document> = docs.into_iter().collect();
        for stage in &self.stages {
            docs = stage.apply(docs);
        }
        docs
    }
}

impl Stage {
    fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        match self {
            Stage::Match { field, range } => {
                docs.retain(|doc| {
                    doc.get(field)
                        .and_then(Value::as_time)
                        .is_some_and(|t| range.contains(t))
                });
                docs
            }
            Stage::Group { by, accumulators } => group(docs, by, accumulators),
            Stage::Project(fields) => docs
                .into_iter()
                .map(|doc| {
                    fields
                        .iter()
                        .filter_map(|p| doc.get(&p.source).map(|v| (p.name.clone(), v.clone())))
                        .collect()
                })
                .collect(),
            Stage::Sort(keys) => {
                // stable: ties keep store order
                docs.sort_by(|a, b| compare(a, b, keys));
                docs
            }
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
        }
    }
}

fn group(docs: Vec<Document>, by: &[GroupKey], accumulators: &[Accumulator]) -> Vec<Document> {
    let mut groups: BTreeMap<Vec<Option<Value>>, Vec<i64>> = BTreeMap::new();

    for doc in &docs {
        let key: Vec<Option<Value>> = by.iter().map(|k| k.extract(doc)).collect();
        let totals = groups
            .entry(key)
            .or_insert_with(|| vec![0; accumulators.len()]);
        for (total, acc) in totals.iter_mut().zip(accumulators) {
            *total += acc.op.contribution(doc);
        }
    }

    groups
        .into_iter()
        .map(|(key, totals)| {
            let mut out = Document::new();
            for (k, v) in by.iter().zip(key) {
                if let Some(v) = v {
                    out.insert(k.name().to_owned(), v);
                }
            }
            for (acc, total) in accumulators.iter().zip(totals) {
                out.insert(acc.name.clone(), Value::Int(total));
            }
            out
        })
        .collect()
}

impl GroupKey {
    fn name(&self) -> &str {
        match self {
            GroupKey::Field { name, .. } | GroupKey::MinuteOf { name, .. } => name,
        }
    }

    fn extract(&self, doc: &Document) -> Option<Value> {
        match self {
            GroupKey::Field { field, .. } => doc.get(field).cloned(),
            GroupKey::MinuteOf { field, .. } => doc
                .get(field)
                .and_then(Value::as_time)
                .map(|t| Value::Str(minute_bucket(t))),
        }
    }
}

impl AccumulatorOp {
    fn contribution(&self, doc: &Document) -> i64 {
        match self {
            AccumulatorOp::Sum(field) => doc.get(field).and_then(Value::as_int).unwrap_or(0),
            AccumulatorOp::Count => 1,
            AccumulatorOp::CountEq { field, value } => {
                i64::from(doc.get(field).and_then(Value::as_int) == Some(*value))
            }
        }
    }
}

fn compare(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|k| {
            let ord = a.get(&k.field).cmp(&b.get(&k.field));
            match k.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, h, m, s).unwrap()
    }

    fn doc(fields: &[(&str, Value)]) -> Document {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn match_drops_documents_without_timestamp() {
        let stage = Stage::Match {
            field: "time".into(),
            range: TimeRange::new(at(13, 0, 0), at(14, 0, 0)),
        };
        let out = Pipeline::new(vec![stage]).run(vec![
            doc(&[("time", Value::Time(at(13, 30, 0)))]),
            doc(&[("time", Value::Str("2024-01-05 13:30:00".into()))]),
            doc(&[("other", Value::Int(1))]),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn group_sums_counts_and_filters() {
        let stage = Stage::Group {
            by: vec![GroupKey::Field {
                name: "k".into(),
                field: "key".into(),
            }],
            accumulators: vec![
                Accumulator::new("sum", AccumulatorOp::Sum("rt".into())),
                Accumulator::new("n", AccumulatorOp::Count),
                Accumulator::new(
                    "bad",
                    AccumulatorOp::CountEq {
                        field: "code".into(),
                        value: 500,
                    },
                ),
            ],
        };
        let input = vec![
            doc(&[("key", Value::Int(2)), ("rt", Value::Int(5)), ("code", Value::Int(500))]),
            doc(&[("key", Value::Int(1)), ("rt", Value::Int(7)), ("code", Value::Int(200))]),
            doc(&[("key", Value::Int(2)), ("rt", Value::Int(9)), ("code", Value::Int(200))]),
        ];
        let out = Pipeline::new(vec![stage]).run(input);

        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            doc(&[
                ("k", Value::Int(1)),
                ("sum", Value::Int(7)),
                ("n", Value::Int(1)),
                ("bad", Value::Int(0)),
            ])
        );
        assert_eq!(out[1]["sum"], Value::Int(14));
        assert_eq!(out[1]["n"], Value::Int(2));
        assert_eq!(out[1]["bad"], Value::Int(1));
    }

    #[test]
    fn project_renames_and_omits_missing() {
        let stage = Stage::Project(vec![
            Projection::keep("a"),
            Projection::rename("when", "time"),
            Projection::keep("missing"),
        ]);
        let out = Pipeline::new(vec![stage]).run(vec![doc(&[
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
            ("time", Value::Time(at(13, 0, 0))),
        ])]);
        assert_eq!(
            out,
            vec![doc(&[("a", Value::Int(1)), ("when", Value::Time(at(13, 0, 0)))])]
        );
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let stage = Stage::Sort(vec![SortKey::desc("t")]);
        let input = vec![
            doc(&[("t", Value::Int(1)), ("id", Value::Int(0))]),
            doc(&[("t", Value::Int(2)), ("id", Value::Int(1))]),
            doc(&[("t", Value::Int(1)), ("id", Value::Int(2))]),
        ];
        let ids: Vec<i64> = Pipeline::new(vec![stage])
            .run(input)
            .iter()
            .map(|d| d["id"].as_int().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 0, 2]);
    }

    #[test]
    fn leading_range_only_for_first_match() {
        let range = TimeRange::new(at(13, 0, 0), at(14, 0, 0));
        let matched = Pipeline::new(vec![
            Stage::Match {
                field: "time".into(),
                range,
            },
            Stage::Limit(1),
        ]);
        assert_eq!(matched.leading_range(), Some(&range));

        let late = Pipeline::new(vec![
            Stage::Limit(1),
            Stage::Match {
                field: "time".into(),
                range,
            },
        ]);
        assert_eq!(late.leading_range(), None);
    }
}

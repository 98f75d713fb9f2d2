use async_trait::async_trait;
use parking_lot::RwLock;

use super::{RecordStore, StoreError};
use crate::record::{Record, TimeRange};

/// In-process store, used by tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn scan(&self, range: Option<&TimeRange>) -> Result<Vec<Record>, StoreError> {
        let mut out: Vec<Record> = self
            .records
            .read()
            .iter()
            .filter(|r| range.map_or(true, |range| range.contains(&r.time)))
            .cloned()
            .collect();
        // Seeded history may be inserted out of order
        out.sort_by_key(|r| r.time);
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

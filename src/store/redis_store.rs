use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{RecordStore, StoreError};
use crate::record::{Record, TimeRange};

/// Redis-backed store.
///
/// Each record lives at `{prefix}:record:{uuid}` as JSON, and a sorted set
/// `{prefix}:records:by_time` indexes the uuids by `time` in microseconds.
/// `ConnectionManager` is cheaply cloneable and reconnects on its own, so
/// one handle is shared by every request.
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: prefix.to_owned(),
        })
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:record:{id}", self.prefix)
    }

    fn index_key(&self) -> String {
        format!("{}:records:by_time", self.prefix)
    }
}

/// `ZRANGEBYSCORE` bounds for a half-open range.
fn score_bounds(range: Option<&TimeRange>) -> (String, String) {
    match range {
        Some(r) => (
            r.from.timestamp_micros().to_string(),
            format!("({}", r.to.timestamp_micros()),
        ),
        None => ("-inf".into(), "+inf".into()),
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let json = serde_json::to_string(record).map_err(StoreError::Serialize)?;

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .set(self.record_key(&id), json)
            .ignore()
            .zadd(self.index_key(), &id, record.time.timestamp_micros())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn scan(&self, range: Option<&TimeRange>) -> Result<Vec<Record>, StoreError> {
        let (min, max) = score_bounds(range);
        let mut conn = self.conn.clone();

        let ids: Vec<String> = conn.zrangebyscore(self.index_key(), min, max).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.record_key(id)).collect();
        let blobs: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        // A missing blob means the record was removed behind our back
        ids.into_iter()
            .zip(blobs)
            .filter_map(|(id, blob)| blob.map(|b| (id, b)))
            .map(|(id, blob)| {
                serde_json::from_str(&blob).map_err(|source| StoreError::Corrupt { id, source })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AppConfig, StoreBackend};
use crate::query::{Document, Pipeline};
use crate::record::{Record, TimeRange};

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("corrupt record {id}: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Append-only collection of records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &Record) -> Result<(), StoreError>;

    /// Records ascending by `time`, restricted to `range` when given.
    async fn scan(&self, range: Option<&TimeRange>) -> Result<Vec<Record>, StoreError>;

    /// Execute `pipeline`, answering its leading match from `scan`.
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError> {
        let records = self.scan(pipeline.leading_range()).await?;
        Ok(pipeline.run(records.into_iter().map(Document::from)))
    }

    /// Execute several pipelines. When they share one leading range the
    /// store is scanned once and every pipeline runs over that result.
    async fn aggregate_all(&self, pipelines: &[&Pipeline]) -> Result<Vec<Vec<Document>>, StoreError> {
        let range = pipelines.first().and_then(|p| p.leading_range()).copied();
        if !pipelines.iter().all(|p| p.leading_range() == range.as_ref()) {
            let mut out = Vec::with_capacity(pipelines.len());
            for pipeline in pipelines {
                out.push(self.aggregate(pipeline).await?);
            }
            return Ok(out);
        }

        let docs: Vec<Document> = self
            .scan(range.as_ref())
            .await?
            .into_iter()
            .map(Document::from)
            .collect();
        Ok(pipelines.iter().map(|p| p.run(docs.iter().cloned())).collect())
    }

    async fn ping(&self) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}

/// Open the store selected by `config`.
pub async fn connect(config: &AppConfig) -> Result<Box<dyn RecordStore>, StoreError> {
    let store: Box<dyn RecordStore> = match config.store_backend {
        StoreBackend::Memory => Box::new(MemoryStore::new()),
        StoreBackend::Redis => {
            Box::new(RedisStore::connect(&config.redis_url, &config.redis_key_prefix).await?)
        }
    };
    store.ping().await?;
    Ok(store)
}

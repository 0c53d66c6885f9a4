use crate::core::cache::{RateStore, check_overwrite};
use crate::core::error::StorageError;
use crate::core::rate::{CacheKey, RateEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory rate store, lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryRateStore {
    inner: Arc<Mutex<HashMap<CacheKey, RateEntry>>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resolved keys held.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<RateEntry>, StorageError> {
        let cache = self.inner.lock().await;
        let entry = cache.get(key).cloned();
        if entry.is_some() {
            debug!("Cache HIT for key: {}", key);
        } else {
            debug!("Cache MISS for key: {}", key);
        }
        Ok(entry)
    }

    async fn put(&self, key: &CacheKey, entry: &RateEntry) -> Result<(), StorageError> {
        let mut cache = self.inner.lock().await;
        if check_overwrite(key, cache.get(key), entry)? {
            debug!("Cache PUT for key: {}", key);
            cache.insert(key.clone(), entry.clone());
        }
        Ok(())
    }
}

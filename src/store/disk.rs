use crate::core::cache::{RateStore, check_overwrite, decode_entry, encode_entry};
use crate::core::error::StorageError;
use crate::core::rate::{CacheKey, RateEntry};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Rate store backed by a fjall keyspace.
///
/// Each currency gets its own partition; records are keyed by the ISO day.
/// Puts are serialized within a store, so a keyspace directory must be opened
/// by one store at a time.
pub struct FjallRateStore {
    keyspace: Arc<Keyspace>,
    partitions: RwLock<HashMap<String, PartitionHandle>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl FjallRateStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path)?;
        let keyspace = fjall::Config::new(path).open()?;
        debug!("Opened rate cache at {}", path.display());

        Ok(Self {
            keyspace: Arc::new(keyspace),
            partitions: RwLock::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn cached_partition(&self, name: &str) -> Option<PartitionHandle> {
        self.partitions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// Partition for `name` if it was ever created.
    fn existing_partition(&self, name: &str) -> Result<Option<PartitionHandle>, StorageError> {
        if let Some(partition) = self.cached_partition(name) {
            return Ok(Some(partition));
        }
        if !self.keyspace.partition_exists(name) {
            return Ok(None);
        }
        self.open_partition(name).map(Some)
    }

    fn open_partition(&self, name: &str) -> Result<PartitionHandle, StorageError> {
        if let Some(partition) = self.cached_partition(name) {
            return Ok(partition);
        }
        let partition = self
            .keyspace
            .open_partition(name, PartitionCreateOptions::default())?;
        self.partitions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), partition.clone());
        Ok(partition)
    }
}

#[async_trait]
impl RateStore for FjallRateStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<RateEntry>, StorageError> {
        let Some(partition) = self.existing_partition(key.namespace())? else {
            debug!("Cache MISS for key: {} (no partition)", key);
            return Ok(None);
        };

        match partition.get(key.record_name())? {
            Some(bytes) => {
                debug!("Cache HIT for key: {}", key);
                decode_entry(key, &bytes).map(Some)
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, entry: &RateEntry) -> Result<(), StorageError> {
        let partition = self.open_partition(key.namespace())?;
        let record = key.record_name();
        let _guard = self.write_lock.lock().await;

        let existing = partition
            .get(&record)?
            .map(|bytes| decode_entry(key, &bytes))
            .transpose()?;
        if !check_overwrite(key, existing.as_ref(), entry)? {
            return Ok(());
        }

        partition.insert(record.as_bytes(), encode_entry(entry)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Cache PUT for key: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::Rate;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::tempdir;

    fn key(currency: &str, d: u32) -> CacheKey {
        CacheKey::new(
            currency.parse().unwrap(),
            NaiveDate::from_ymd_opt(2022, 4, d).unwrap(),
        )
    }

    fn present(d: u32, mid: &str) -> RateEntry {
        RateEntry::Present(Rate {
            table_no: "074/A/NBP/2022".to_string(),
            day: NaiveDate::from_ymd_opt(2022, 4, d).unwrap(),
            mid: Decimal::from_str(mid).unwrap(),
        })
    }

    #[tokio::test]
    async fn test_fjall_store_get_put() {
        let dir = tempdir().unwrap();
        let store = FjallRateStore::open(dir.path()).unwrap();

        // Initially, store is empty
        assert!(store.get(&key("EUR", 15)).await.unwrap().is_none());

        store.put(&key("EUR", 15), &present(15, "4.6378")).await.unwrap();
        store.put(&key("EUR", 16), &RateEntry::Absent).await.unwrap();

        assert_eq!(
            store.get(&key("EUR", 15)).await.unwrap(),
            Some(present(15, "4.6378"))
        );
        assert_eq!(
            store.get(&key("EUR", 16)).await.unwrap(),
            Some(RateEntry::Absent)
        );
        // Namespaced per currency
        assert!(store.get(&key("USD", 15)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fjall_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FjallRateStore::open(dir.path()).unwrap();
            store.put(&key("CHF", 15), &present(15, "4.6650")).await.unwrap();
            store.put(&key("CHF", 17), &RateEntry::Absent).await.unwrap();
        }

        let store = FjallRateStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get(&key("CHF", 15)).await.unwrap(),
            Some(present(15, "4.6650"))
        );
        assert_eq!(
            store.get(&key("CHF", 17)).await.unwrap(),
            Some(RateEntry::Absent)
        );
    }

    #[tokio::test]
    async fn test_fjall_store_rejects_different_content() {
        let dir = tempdir().unwrap();
        let store = FjallRateStore::open(dir.path()).unwrap();

        store.put(&key("EUR", 15), &present(15, "4.6378")).await.unwrap();
        store.put(&key("EUR", 15), &present(15, "4.6378")).await.unwrap();

        let result = store.put(&key("EUR", 15), &present(15, "4.7000")).await;
        assert!(matches!(result, Err(StorageError::Conflict { .. })));
        assert_eq!(
            store.get(&key("EUR", 15)).await.unwrap(),
            Some(present(15, "4.6378"))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fjall_store_concurrent_puts_keep_first_entry() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FjallRateStore::open(dir.path()).unwrap());

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.put(&key("EUR", 15), &present(15, "4.6378")).await }
        });
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.put(&key("EUR", 15), &RateEntry::Absent).await }
        });
        let (a, b) = (first.await.unwrap(), second.await.unwrap());

        let stored = store.get(&key("EUR", 15)).await.unwrap();
        match (a, b) {
            (Ok(()), Err(StorageError::Conflict { .. })) => {
                assert_eq!(stored, Some(present(15, "4.6378")))
            }
            (Err(StorageError::Conflict { .. }), Ok(())) => {
                assert_eq!(stored, Some(RateEntry::Absent))
            }
            other => panic!("Expected exactly one writer to win, got {other:?}"),
        }
    }
}

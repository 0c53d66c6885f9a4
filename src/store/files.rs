use crate::core::cache::{RateStore, check_overwrite, decode_entry, encode_entry};
use crate::core::error::StorageError;
use crate::core::rate::{CacheKey, RateEntry};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Temp file suffix, unique across every store in the process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Rate store laid out as plain files: `<root>/<CODE>/<YYYY-MM-DD>.json`.
///
/// Records are published with a hard link, which never replaces an existing
/// file, so stores sharing a directory cannot overwrite each other.
pub struct FileRateStore {
    root: PathBuf,
}

impl FileRateStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.namespace())
    }

    fn file(&self, key: &CacheKey) -> PathBuf {
        self.dir(key).join(format!("{}.json", key.record_name()))
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<RateEntry>, StorageError> {
        match tokio::fs::read(self.file(key)).await {
            Ok(bytes) => decode_entry(key, &bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RateStore for FileRateStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<RateEntry>, StorageError> {
        let entry = self.read(key).await?;
        if entry.is_some() {
            debug!("Cache HIT for key: {}", key);
        } else {
            debug!("Cache MISS for key: {}", key);
        }
        Ok(entry)
    }

    async fn put(&self, key: &CacheKey, entry: &RateEntry) -> Result<(), StorageError> {
        let existing = self.read(key).await?;
        if !check_overwrite(key, existing.as_ref(), entry)? {
            return Ok(());
        }

        let dir = self.dir(key);
        tokio::fs::create_dir_all(&dir).await?;

        // Readers never see a partial record: the full temp file is linked in place
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(
            ".{}.{}.{}.tmp",
            key.record_name(),
            std::process::id(),
            seq
        ));
        if let Err(e) = tokio::fs::write(&tmp, encode_entry(entry)?).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        let linked = tokio::fs::hard_link(&tmp, self.file(key)).await;
        let _ = tokio::fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => {
                debug!("Cache PUT for key: {}", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Another writer got there first
                let existing = self.read(key).await?;
                check_overwrite(key, existing.as_ref(), entry).map(|_| ())
            }
            Err(e) => Err(e.into()),
        }
    }
}

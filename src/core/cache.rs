use crate::core::error::StorageError;
use crate::core::rate::{CacheKey, RateEntry};
use async_trait::async_trait;

/// Durable mapping from [`CacheKey`] to [`RateEntry`].
///
/// Records are immutable once written: putting equal content again is a
/// no-op, putting different content fails with [`StorageError::Conflict`].
/// Implementations make the check and the write atomic for concurrent callers.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Returns `Ok(None)` when the key was never resolved.
    async fn get(&self, key: &CacheKey) -> Result<Option<RateEntry>, StorageError>;

    /// Persists the entry, creating the currency namespace if needed.
    async fn put(&self, key: &CacheKey, entry: &RateEntry) -> Result<(), StorageError>;
}

/// Shared immutability check for store implementations.
pub(crate) fn check_overwrite(
    key: &CacheKey,
    existing: Option<&RateEntry>,
    entry: &RateEntry,
) -> Result<bool, StorageError> {
    match existing {
        None => Ok(true),
        Some(current) if current == entry => Ok(false),
        Some(_) => Err(StorageError::Conflict {
            key: key.to_string(),
        }),
    }
}

pub(crate) fn encode_entry(entry: &RateEntry) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(entry).map_err(StorageError::Encode)
}

pub(crate) fn decode_entry(key: &CacheKey, bytes: &[u8]) -> Result<RateEntry, StorageError> {
    serde_json::from_slice(bytes).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })
}

pub mod disk;
pub mod files;
pub mod memory;

use crate::core::cache::RateStore;
use crate::core::config::{AppConfig, CacheBackend};
use anyhow::{Context, Result};
use disk::FjallRateStore;
use files::FileRateStore;
use memory::MemoryRateStore;
use std::sync::Arc;
use tracing::debug;

/// Opens the rate store selected by the configuration.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn RateStore>> {
    let store: Arc<dyn RateStore> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryRateStore::new()),
        CacheBackend::Files => Arc::new(FileRateStore::new(config.cache_path()?)),
        CacheBackend::Fjall => {
            let path = config.cache_path()?;
            let store = FjallRateStore::open(&path)
                .with_context(|| format!("Failed to open rate cache at {}", path.display()))?;
            Arc::new(store)
        }
    };
    debug!(backend = ?config.cache.backend, "Opened rate store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CacheConfig;
    use crate::core::rate::{CacheKey, RateEntry};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_each_backend() {
        let dir = tempdir().unwrap();
        let key = CacheKey::new(
            "EUR".parse().unwrap(),
            NaiveDate::from_ymd_opt(2022, 4, 17).unwrap(),
        );

        for backend in [CacheBackend::Memory, CacheBackend::Files, CacheBackend::Fjall] {
            let config = AppConfig {
                cache: CacheConfig {
                    backend,
                    path: Some(
                        dir.path()
                            .join(format!("{backend:?}"))
                            .to_string_lossy()
                            .into_owned(),
                    ),
                },
                ..AppConfig::default()
            };
            let store = open_store(&config).unwrap();
            store.put(&key, &RateEntry::Absent).await.unwrap();
            assert_eq!(store.get(&key).await.unwrap(), Some(RateEntry::Absent));
        }
    }
}

//! Single-day rate resolution over the cache and the upstream fetcher

use crate::core::cache::RateStore;
use crate::core::error::{RateError, Result};
use crate::core::fetcher::{FetchOutcome, RateFetcher};
use crate::core::rate::{CacheKey, CurrencyCode, Rate, RateEntry};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Resolves one day's rate, caching only outcomes that hold forever for the key.
///
/// Confirmed rates and confirmed non-trading days are written to the store.
/// Unknown currencies, rejected requests and transient failures are not.
pub struct RateResolver {
    store: Arc<dyn RateStore>,
    fetcher: Arc<dyn RateFetcher>,
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    unknown_currencies: Option<RwLock<HashSet<CurrencyCode>>>,
}

impl RateResolver {
    pub fn new(store: Arc<dyn RateStore>, fetcher: Arc<dyn RateFetcher>) -> Self {
        Self {
            store,
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
            unknown_currencies: None,
        }
    }

    /// Remember currencies the source reported as unknown for the lifetime of
    /// this resolver, instead of asking again for every day.
    pub fn remember_unknown_currencies(mut self, enabled: bool) -> Self {
        self.unknown_currencies = enabled.then(|| RwLock::new(HashSet::new()));
        self
    }

    #[instrument(name = "RateResolve", skip(self), fields(currency = %currency, day = %day))]
    pub async fn resolve(&self, currency: &CurrencyCode, day: NaiveDate) -> Result<Rate> {
        let key = CacheKey::new(currency.clone(), day);
        if let Some(entry) = self.store.get(&key).await? {
            return entry_to_result(&key, entry);
        }

        if self.is_known_unknown(currency).await {
            debug!("Skipping fetch for remembered unknown currency {}", currency);
            return Err(RateError::NoRateForCurrency {
                currency: currency.clone(),
            });
        }

        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            // Another caller may have resolved the key while we waited
            match self.store.get(&key).await {
                Ok(Some(entry)) => entry_to_result(&key, entry),
                Ok(None) => self.fetch_and_store(&key).await,
                Err(e) => Err(e.into()),
            }
        };
        self.release_key_lock(&key, lock).await;
        result
    }

    async fn fetch_and_store(&self, key: &CacheKey) -> Result<Rate> {
        info!("Fetching rate for {}", key);
        match self.fetcher.fetch(&key.currency, key.day).await {
            FetchOutcome::Rate(rate) => {
                if rate.day != key.day {
                    warn!(
                        "Source returned a rate effective {} for {}, not caching",
                        rate.day, key
                    );
                    return Err(RateError::Transient(format!(
                        "expected a rate effective {}, got {}",
                        key.day, rate.day
                    )));
                }
                self.store.put(key, &RateEntry::Present(rate.clone())).await?;
                Ok(rate)
            }
            FetchOutcome::NonTradingDay => {
                self.store.put(key, &RateEntry::Absent).await?;
                Err(no_rate_for_day(key))
            }
            FetchOutcome::UnknownCurrency => {
                if let Some(unknown) = &self.unknown_currencies {
                    unknown.write().await.insert(key.currency.clone());
                }
                Err(RateError::NoRateForCurrency {
                    currency: key.currency.clone(),
                })
            }
            FetchOutcome::Rejected { status, body } => Err(RateError::Rejected { status, body }),
            FetchOutcome::Transient(detail) => Err(RateError::Transient(detail)),
        }
    }

    async fn is_known_unknown(&self, currency: &CurrencyCode) -> bool {
        match &self.unknown_currencies {
            Some(unknown) => unknown.read().await.contains(currency),
            None => false,
        }
    }

    async fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        Arc::clone(in_flight.entry(key.clone()).or_default())
    }

    async fn release_key_lock(&self, key: &CacheKey, lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // The map holds one reference and we hold the other
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    async fn in_flight_len(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

fn entry_to_result(key: &CacheKey, entry: RateEntry) -> Result<Rate> {
    match entry {
        RateEntry::Present(rate) => Ok(rate),
        RateEntry::Absent => Err(no_rate_for_day(key)),
    }
}

fn no_rate_for_day(key: &CacheKey) -> RateError {
    RateError::NoRateForDay {
        currency: key.currency.clone(),
        day: key.day,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fetcher answering from a fixed script, counting calls.
    pub struct ScriptedFetcher {
        pub responses: HashMap<(String, NaiveDate), FetchOutcome>,
        pub fallback: FetchOutcome,
        pub delay: Option<Duration>,
        pub call_count: AtomicUsize,
    }

    impl ScriptedFetcher {
        pub fn new(fallback: FetchOutcome) -> Self {
            Self {
                responses: HashMap::new(),
                fallback,
                delay: None,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn with(mut self, currency: &str, day: NaiveDate, outcome: FetchOutcome) -> Self {
            self.responses.insert((currency.to_string(), day), outcome);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateFetcher for ScriptedFetcher {
        async fn fetch(&self, currency: &CurrencyCode, day: NaiveDate) -> FetchOutcome {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .get(&(currency.to_string(), day))
                .cloned()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn rate(table_no: &str, day: NaiveDate, mid: &str) -> Rate {
        Rate {
            table_no: table_no.to_string(),
            day,
            mid: mid.parse().unwrap(),
        }
    }
}

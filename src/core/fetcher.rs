//! Upstream rate source abstraction

use crate::core::rate::{CurrencyCode, Rate};
use async_trait::async_trait;
use chrono::NaiveDate;

/// What the upstream source said about one (currency, day) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Rate(Rate),
    /// The source confirmed there is no rate for that day.
    NonTradingDay,
    /// The source publishes no rates for the currency at all.
    UnknownCurrency,
    /// Definitive refusal not tied to the day, e.g. a bad request.
    Rejected { status: u16, body: String },
    /// Network or decoding failure; the same request may succeed later.
    Transient(String),
}

#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch(&self, currency: &CurrencyCode, day: NaiveDate) -> FetchOutcome;
}

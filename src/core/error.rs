//! Error types for rate resolution and cache storage

use crate::core::rate::CurrencyCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Failure to read or write the rate cache.
///
/// A storage failure is never the same thing as a cache miss.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache backend error: {0}")]
    Backend(#[from] fjall::Error),

    #[error("Corrupt cache record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode cache record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Cache record {key} already holds a different entry")]
    Conflict { key: String },
}

/// Everything that can go wrong while resolving a rate.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("No exchange rate for {currency} on {day}")]
    NoRateForDay { currency: CurrencyCode, day: NaiveDate },

    #[error("Currency without published rates: {currency}")]
    NoRateForCurrency { currency: CurrencyCode },

    #[error("Rate request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(
        "No exchange rate for {currency} within {max_lookback_days} days before {reference_day}"
    )]
    LookbackExceeded {
        currency: CurrencyCode,
        reference_day: NaiveDate,
        max_lookback_days: u32,
    },
}

impl RateError {
    /// Whether retrying the same lookup later may succeed.
    ///
    /// Corrupt or conflicting cache records stay that way for the key.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RateError::Transient(_)
                | RateError::Storage(StorageError::Io(_) | StorageError::Backend(_))
        )
    }
}

pub type Result<T, E = RateError> = std::result::Result<T, E>;

//! Core rate resolution: types, cache contract and resolvers

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod log;
pub mod previous;
pub mod rate;
pub mod resolver;

// Re-export main types for cleaner imports
pub use cache::RateStore;
pub use error::{RateError, StorageError};
pub use fetcher::{FetchOutcome, RateFetcher};
pub use previous::PreviousRateResolver;
pub use rate::{CacheKey, CurrencyCode, Rate, RateEntry};
pub use resolver::RateResolver;

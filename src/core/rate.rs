//! Rate and cache key types

use crate::core::error::RateError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Format used for days in URLs, cache keys and file names.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

const MAX_CODE_LEN: usize = 16;

/// Upper-cased currency code, e.g. `EUR`.
///
/// The code names the cache namespace for the currency, so only ASCII
/// alphanumerics are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.is_empty()
            || code.len() > MAX_CODE_LEN
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(RateError::InvalidCurrency(s.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mid rate published for one currency on one trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub table_no: String,
    #[serde(rename = "effective_day")]
    pub day: NaiveDate,
    pub mid: Decimal,
}

/// Identifies one lookup: a currency on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub currency: CurrencyCode,
    pub day: NaiveDate,
}

impl CacheKey {
    pub fn new(currency: CurrencyCode, day: NaiveDate) -> Self {
        Self { currency, day }
    }

    /// Namespace the record lives in.
    pub fn namespace(&self) -> &str {
        self.currency.as_str()
    }

    /// Record name inside the namespace, `YYYY-MM-DD`.
    pub fn record_name(&self) -> String {
        self.day.format(DAY_FORMAT).to_string()
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.currency, self.record_name())
    }
}

/// Resolved outcome stored for a [`CacheKey`].
///
/// `Absent` records a confirmed non-trading day. A key that was never
/// resolved has no entry at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RateEntry {
    Present(Rate),
    Absent,
}

//! Backward search for the last trading day's rate

use crate::core::error::{RateError, Result};
use crate::core::rate::{CurrencyCode, Rate};
use crate::core::resolver::RateResolver;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEFAULT_MAX_LOOKBACK_DAYS: u32 = 30;

/// Finds the rate in effect on the closest trading day strictly before a
/// reference day, giving up after `max_lookback_days` days without a rate.
pub struct PreviousRateResolver {
    resolver: Arc<RateResolver>,
    max_lookback_days: u32,
}

impl PreviousRateResolver {
    pub fn new(resolver: Arc<RateResolver>) -> Self {
        Self {
            resolver,
            max_lookback_days: DEFAULT_MAX_LOOKBACK_DAYS,
        }
    }

    pub fn with_max_lookback_days(mut self, days: u32) -> Self {
        self.max_lookback_days = days;
        self
    }

    pub fn resolver(&self) -> &RateResolver {
        &self.resolver
    }

    #[instrument(
        name = "PreviousRateResolve",
        skip(self),
        fields(currency = %currency, reference_day = %reference_day)
    )]
    pub async fn resolve_previous(
        &self,
        currency: &CurrencyCode,
        reference_day: NaiveDate,
    ) -> Result<Rate> {
        let mut probe = reference_day;
        for _ in 0..self.max_lookback_days {
            let Some(previous) = probe.pred_opt() else {
                break;
            };
            probe = previous;

            match self.resolver.resolve(currency, probe).await {
                Ok(rate) => return Ok(rate),
                Err(RateError::NoRateForDay { .. }) => {
                    debug!("No rate on {}, stepping back", probe);
                }
                Err(e) => return Err(e),
            }
        }

        Err(RateError::LookbackExceeded {
            currency: currency.clone(),
            reference_day,
            max_lookback_days: self.max_lookback_days,
        })
    }
}

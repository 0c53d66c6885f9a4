pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::error::RateError;
use crate::core::{CurrencyCode, PreviousRateResolver, Rate, RateResolver};
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Commands the application can run.
pub enum AppCommand {
    /// Rates published on the given day (today when not set).
    Rate {
        currencies: Vec<String>,
        day: Option<NaiveDate>,
    },
    /// Rates of the last trading day strictly before the given day.
    Previous {
        currencies: Vec<String>,
        day: Option<NaiveDate>,
    },
}

/// Cached NBP rate lookups wired from configuration.
pub struct RateService {
    previous: PreviousRateResolver,
}

impl RateService {
    pub fn new(resolver: RateResolver, max_lookback_days: u32) -> Self {
        Self {
            previous: PreviousRateResolver::new(Arc::new(resolver))
                .with_max_lookback_days(max_lookback_days),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = store::open_store(config)?;
        let fetcher = providers::NbpFetcher::new(
            &config.provider.base_url,
            Duration::from_secs(config.provider.timeout_secs),
        )?;
        let resolver = RateResolver::new(store, Arc::new(fetcher))
            .remember_unknown_currencies(config.remember_unknown_currencies);
        Ok(Self::new(resolver, config.max_lookback_days))
    }

    /// Rate published for `currency` on `day`.
    pub async fn rate(&self, currency: &CurrencyCode, day: NaiveDate) -> Result<Rate, RateError> {
        self.previous.resolver().resolve(currency, day).await
    }

    /// Rate of the closest trading day strictly before `day`.
    pub async fn previous_rate(
        &self,
        currency: &CurrencyCode,
        day: NaiveDate,
    ) -> Result<Rate, RateError> {
        self.previous.resolve_previous(currency, day).await
    }
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load_or_default(),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("NBP rates starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let service = RateService::from_config(&config)?;
    let today = chrono::Local::now().date_naive();

    match command {
        AppCommand::Rate { currencies, day } => {
            cli::rate::run(
                &service,
                &currencies,
                day.unwrap_or(today),
                cli::rate::Lookup::OnDay,
            )
            .await
        }
        AppCommand::Previous { currencies, day } => {
            cli::rate::run(
                &service,
                &currencies,
                day.unwrap_or(today),
                cli::rate::Lookup::Previous,
            )
            .await
        }
    }
}

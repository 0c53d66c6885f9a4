use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::fetcher::{FetchOutcome, RateFetcher};
use crate::core::rate::{CurrencyCode, DAY_FORMAT, Rate};

/// Marker NBP puts in 404 bodies for days without a published table.
const NO_DATA_MARKER: &str = "Brak danych";

// NbpFetcher implementation for RateFetcher over NBP table A
pub struct NbpFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl NbpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nbprates/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(NbpFetcher {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NbpRatesResponse {
    rates: Vec<NbpDailyRate>,
}

#[derive(Debug, Deserialize)]
struct NbpDailyRate {
    no: String,
    #[serde(rename = "effectiveDate")]
    effective_date: String,
    /// Decoded from the number's source text, never through a float.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    mid: Decimal,
}

fn decode_rate(body: &str) -> Result<Rate, String> {
    let data: NbpRatesResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse JSON response: {e}"))?;

    let [daily] = data.rates.as_slice() else {
        return Err(format!(
            "Expected a single rate, got {}",
            data.rates.len()
        ));
    };

    let day = NaiveDate::parse_from_str(&daily.effective_date, DAY_FORMAT).map_err(|e| {
        format!(
            "Can't parse effective date {:?}: {e}",
            daily.effective_date
        )
    })?;

    Ok(Rate {
        table_no: daily.no.clone(),
        day,
        mid: daily.mid,
    })
}

#[async_trait]
impl RateFetcher for NbpFetcher {
    #[instrument(
        name = "NbpRateFetch",
        skip(self),
        fields(currency = %currency, day = %day)
    )]
    async fn fetch(&self, currency: &CurrencyCode, day: NaiveDate) -> FetchOutcome {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            currency,
            day.format(DAY_FORMAT)
        );
        debug!("Requesting rate from {}", url);

        let response = match self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return FetchOutcome::Transient(format!(
                    "Request error: {e} for {currency} URL: {url}"
                ));
            }
        };

        let status = response.status();
        debug!(%status, "Received NBP response");
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return FetchOutcome::Transient(format!("Can't read response: {e}")),
        };

        match status {
            StatusCode::OK => match decode_rate(&body) {
                Ok(rate) => FetchOutcome::Rate(rate),
                Err(detail) => {
                    warn!("Unexpected payload for {} on {}: {}", currency, day, detail);
                    FetchOutcome::Transient(detail)
                }
            },
            StatusCode::NOT_FOUND if body.contains(NO_DATA_MARKER) => FetchOutcome::NonTradingDay,
            StatusCode::NOT_FOUND => FetchOutcome::UnknownCurrency,
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                FetchOutcome::Transient(format!("HTTP error: {s} for {currency}"))
            }
            s => FetchOutcome::Rejected {
                status: s.as_u16(),
                body,
            },
        }
    }
}

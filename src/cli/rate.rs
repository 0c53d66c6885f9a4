use super::ui;
use crate::RateService;
use crate::core::error::RateError;
use crate::core::rate::{CurrencyCode, DAY_FORMAT, Rate};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use futures::future::join_all;

/// Which day's rate a lookup is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    OnDay,
    Previous,
}

pub struct RateRow {
    pub currency: String,
    pub result: Result<Rate, RateError>,
}

/// Resolves every requested currency concurrently.
pub async fn resolve_all(
    service: &RateService,
    currencies: &[String],
    day: NaiveDate,
    lookup: Lookup,
) -> Vec<RateRow> {
    let pb = ui::new_progress_bar(currencies.len() as u64);
    pb.set_message("Fetching rates");

    let rows = join_all(currencies.iter().map(|raw| {
        let pb = &pb;
        async move {
            let result = match raw.parse::<CurrencyCode>() {
                Ok(code) => match lookup {
                    Lookup::OnDay => service.rate(&code, day).await,
                    Lookup::Previous => service.previous_rate(&code, day).await,
                },
                Err(e) => Err(e),
            };
            pb.inc(1);
            RateRow {
                currency: raw.to_ascii_uppercase(),
                result,
            }
        }
    }))
    .await;

    pb.finish_and_clear();
    rows
}

pub fn display_as_table(rows: &[RateRow], day: NaiveDate, lookup: Lookup) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Table No"),
        ui::header_cell("Day"),
        ui::header_cell("Mid (PLN)"),
    ]);

    for row in rows {
        match &row.result {
            Ok(rate) => table.add_row(vec![
                Cell::new(&row.currency),
                Cell::new(&rate.table_no),
                Cell::new(rate.day.format(DAY_FORMAT)),
                ui::rate_cell(rate.mid.to_string()),
            ]),
            Err(e) => table.add_row(vec![
                Cell::new(&row.currency),
                Cell::new(ui::style_text(&e.to_string(), ui::StyleType::Error)),
                ui::na_cell(),
                ui::na_cell(),
            ]),
        };
    }

    let title = match lookup {
        Lookup::OnDay => format!("NBP table A rates for {}", day.format(DAY_FORMAT)),
        Lookup::Previous => format!(
            "NBP table A rates of the last trading day before {}",
            day.format(DAY_FORMAT)
        ),
    };

    format!(
        "{}\n\n{}\n{}",
        ui::style_text(&title, ui::StyleType::Title),
        table,
        ui::style_text("Source: Narodowy Bank Polski", ui::StyleType::Subtle)
    )
}

pub async fn run(
    service: &RateService,
    currencies: &[String],
    day: NaiveDate,
    lookup: Lookup,
) -> Result<()> {
    if currencies.is_empty() {
        bail!("At least one currency is required, e.g. EUR");
    }

    let rows = resolve_all(service, currencies, day, lookup).await;
    println!("{}", display_as_table(&rows, day, lookup));

    let errors: Vec<&RateError> = rows.iter().filter_map(|row| row.result.as_ref().err()).collect();
    if !errors.is_empty() {
        let retryable = errors.iter().filter(|e| e.is_transient()).count();
        if retryable > 0 {
            bail!(
                "Failed to resolve {} of {} rate(s), {retryable} may succeed if retried later",
                errors.len(),
                rows.len()
            );
        }
        bail!("Failed to resolve {} of {} rate(s)", errors.len(), rows.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetcher::{FetchOutcome, RateFetcher};
    use crate::core::resolver::RateResolver;
    use crate::store::memory::MemoryRateStore;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedFetcher;

    #[async_trait]
    impl RateFetcher for FixedFetcher {
        async fn fetch(&self, currency: &CurrencyCode, day: NaiveDate) -> FetchOutcome {
            match (currency.as_str(), day.format(DAY_FORMAT).to_string().as_str()) {
                ("EUR", "2022-04-15") => FetchOutcome::Rate(Rate {
                    table_no: "074/A/NBP/2022".to_string(),
                    day,
                    mid: "4.6378".parse().unwrap(),
                }),
                ("EUR", _) => FetchOutcome::NonTradingDay,
                ("USD", _) => FetchOutcome::Transient("HTTP error: 503".to_string()),
                _ => FetchOutcome::UnknownCurrency,
            }
        }
    }

    fn service() -> RateService {
        let resolver = RateResolver::new(Arc::new(MemoryRateStore::new()), Arc::new(FixedFetcher));
        RateService::new(resolver, 10)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_order_and_errors() {
        let currencies = vec!["eur".to_string(), "DOGE".to_string(), "e/u".to_string()];
        let rows = resolve_all(&service(), &currencies, day(2022, 4, 18), Lookup::Previous).await;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].currency, "EUR");
        assert_eq!(rows[0].result.as_ref().unwrap().day, day(2022, 4, 15));
        assert!(matches!(
            rows[1].result,
            Err(RateError::NoRateForCurrency { .. })
        ));
        assert!(matches!(rows[2].result, Err(RateError::InvalidCurrency(_))));
    }

    #[tokio::test]
    async fn test_display_as_table() {
        let currencies = vec!["EUR".to_string(), "DOGE".to_string()];
        let rows = resolve_all(&service(), &currencies, day(2022, 4, 15), Lookup::OnDay).await;
        let output = display_as_table(&rows, day(2022, 4, 15), Lookup::OnDay);

        assert!(output.contains("NBP table A rates for 2022-04-15"));
        assert!(output.contains("074/A/NBP/2022"));
        assert!(output.contains("4.6378"));
        assert!(output.contains("Currency without published rates: DOGE"));
    }

    #[tokio::test]
    async fn test_run_fails_when_any_rate_fails() {
        let currencies = vec!["EUR".to_string()];
        let result = run(&service(), &currencies, day(2022, 4, 16), Lookup::OnDay).await;
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Failed to resolve 1 of 1"));
        assert!(!message.contains("retried"));

        let result = run(&service(), &currencies, day(2022, 4, 18), Lookup::Previous).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_reports_retryable_failures() {
        let currencies = vec!["EUR".to_string(), "USD".to_string()];
        let result = run(&service(), &currencies, day(2022, 4, 15), Lookup::OnDay).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Failed to resolve 1 of 2 rate(s), 1 may succeed if retried later"
        );
    }
}

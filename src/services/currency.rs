// src/services/currency.rs

//! Currency conversion over a cached USD rate table.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{CurrencyConfig, ExchangeRates, RateSource};
use crate::storage::Db;
use crate::utils::http::send_json;

const BASE: &str = "USD";

/// Rates used when the API and the cache both fail. Units per 1 USD.
const FALLBACK_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("INR", 83.0),
    ("CAD", 1.36),
    ("AUD", 1.52),
    ("NZD", 1.64),
    ("JPY", 150.0),
    ("KRW", 1330.0),
    ("CNY", 7.2),
    ("SGD", 1.34),
    ("CHF", 0.88),
    ("AED", 3.67),
];

/// Currencies formatted without minor units.
const ZERO_DECIMAL: &[&str] = &["JPY", "KRW"];

/// Exchange rate table shipped with the binary.
pub fn fallback_rates() -> ExchangeRates {
    ExchangeRates {
        base: BASE.to_string(),
        rates: FALLBACK_RATES
            .iter()
            .map(|(code, rate)| (code.to_string(), *rate))
            .collect(),
        fetched_at: Utc::now(),
        source: RateSource::Fallback,
    }
}

/// Convert through the USD pivot: `amount / rate[from] * rate[to]`.
pub fn convert_with(rates: &ExchangeRates, amount: f64, from: &str, to: &str) -> Result<f64> {
    if !amount.is_finite() {
        return Err(AppError::validation("Amount must be a finite number"));
    }
    let from_rate = rate_of(rates, from)?;
    let to_rate = rate_of(rates, to)?;
    Ok(amount / from_rate * to_rate)
}

fn rate_of(rates: &ExchangeRates, code: &str) -> Result<f64> {
    rates
        .rate(code)
        .filter(|r| *r > 0.0)
        .ok_or_else(|| AppError::validation(format!("Unknown currency: {code}")))
}

fn symbol(code: &str) -> Option<&'static str> {
    let symbol = match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "INR" => "₹",
        "CAD" => "C$",
        "AUD" => "A$",
        "NZD" => "NZ$",
        "SGD" => "S$",
        "JPY" | "CNY" => "¥",
        "KRW" => "₩",
        _ => return None,
    };
    Some(symbol)
}

/// Format an amount with symbol, thousands separators and the currency's
/// decimals.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let code = currency.to_uppercase();
    let decimals = if ZERO_DECIMAL.contains(&code.as_str()) { 0 } else { 2 };

    let fixed = format!("{:.*}", decimals, amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }

    let sign = if amount < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match symbol(&code) {
        Some(s) => format!("{sign}{s}{grouped}"),
        None => format!("{sign}{code} {grouped}"),
    }
}

/// Result of one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub converted: f64,
    pub formatted: String,
    pub source: RateSource,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    base: Option<String>,
    rates: HashMap<String, f64>,
}

/// Currency conversion backed by a cached remote rate table.
pub struct CurrencyService {
    client: Client,
    db: Db,
    endpoint: String,
    ttl: Duration,
}

impl CurrencyService {
    pub fn new(client: Client, db: Db, config: &CurrencyConfig) -> Self {
        Self {
            client,
            db,
            endpoint: config.endpoint.clone(),
            ttl: Duration::hours(config.cache_ttl_hours as i64),
        }
    }

    /// Current rate table. Never fails.
    ///
    /// A fresh cached table wins; otherwise the API is asked and the answer
    /// cached. If the API fails, the cached table is used whatever its age,
    /// and without one the built-in fallback table.
    pub async fn rates(&self) -> ExchangeRates {
        let cached = match self.db.exchange_rates(BASE).await {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("Failed to read cached exchange rates: {}", e);
                None
            }
        };

        if let Some(rates) = &cached {
            if rates.is_fresh(self.ttl, Utc::now()) {
                return rates.clone();
            }
        }

        match self.fetch().await {
            Ok(rates) => {
                if let Err(e) = self.db.save_exchange_rates(&rates).await {
                    log::warn!("Failed to cache exchange rates: {}", e);
                }
                rates
            }
            Err(e) => {
                log::warn!("Exchange rate fetch failed: {}", e);
                cached.unwrap_or_else(|| {
                    log::warn!("No cached exchange rates, using fallback table");
                    fallback_rates()
                })
            }
        }
    }

    async fn fetch(&self) -> Result<ExchangeRates> {
        let response: RatesResponse =
            send_json("exchange-rates", self.client.get(&self.endpoint)).await?;

        if let Some(base) = &response.base {
            if !base.eq_ignore_ascii_case(BASE) {
                return Err(AppError::upstream(
                    "exchange-rates",
                    format!("expected {BASE} base, got {base}"),
                ));
            }
        }

        let rates: BTreeMap<String, f64> = response
            .rates
            .into_iter()
            .map(|(code, rate)| (code.to_uppercase(), rate))
            .collect();
        log::debug!("Fetched {} exchange rates", rates.len());

        Ok(ExchangeRates {
            base: BASE.to_string(),
            rates,
            fetched_at: Utc::now(),
            source: RateSource::Remote,
        })
    }

    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<Conversion> {
        let rates = self.rates().await;
        let converted = convert_with(&rates, amount, from, to)?;
        Ok(Conversion {
            amount,
            from: from.to_uppercase(),
            to: to.to_uppercase(),
            converted,
            formatted: format_amount(converted, to),
            source: rates.source,
        })
    }
}

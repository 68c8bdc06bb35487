// src/models/currency.rs

//! Exchange rate table cached in the document store.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Remote,
    Fallback,
}

/// Rates expressed as units of currency per one unit of `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
    pub fetched_at: DateTime<Utc>,
    pub source: RateSource,
}

impl ExchangeRates {
    /// Whether the table is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        let code = currency.to_uppercase();
        if code == self.base {
            return Some(1.0);
        }
        self.rates.get(&code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_uses_ttl() {
        let now = Utc::now();
        let rates = ExchangeRates {
            base: "USD".into(),
            rates: BTreeMap::new(),
            fetched_at: now - Duration::hours(25),
            source: RateSource::Remote,
        };
        assert!(!rates.is_fresh(Duration::hours(24), now));
        assert!(rates.is_fresh(Duration::hours(48), now));
    }

    #[test]
    fn rate_lookup_is_case_insensitive_and_knows_base() {
        let mut table = BTreeMap::new();
        table.insert("EUR".to_string(), 0.9);
        let rates = ExchangeRates {
            base: "USD".into(),
            rates: table,
            fetched_at: Utc::now(),
            source: RateSource::Fallback,
        };
        assert_eq!(rates.rate("usd"), Some(1.0));
        assert_eq!(rates.rate("eur"), Some(0.9));
        assert_eq!(rates.rate("XYZ"), None);
    }
}

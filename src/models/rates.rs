use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire shape returned by the exchange-rates provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesWireResponse {
    pub base: String,
    pub date: Option<String>,
    pub rates: HashMap<String, f64>,
}

/// Canonical shape handed to callers. `fallback` is true when the live
/// call path was exhausted and the pinned table was substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base: String,
    pub rates: HashMap<String, f64>,
    pub as_of: DateTime<Utc>,
    pub fallback: bool,
}

impl ExchangeRates {
    pub fn from_wire(wire: RatesWireResponse) -> Self {
        Self {
            base: wire.base,
            rates: wire.rates,
            as_of: Utc::now(),
            fallback: false,
        }
    }

    /// Deterministic pinned table used when the provider is unreachable.
    pub fn fallback_table(base: &str) -> Self {
        let rates = HashMap::from([
            ("USD".to_string(), 1.0),
            ("EUR".to_string(), 0.92),
            ("GBP".to_string(), 0.79),
            ("JPY".to_string(), 149.50),
            ("CHF".to_string(), 0.88),
        ]);

        Self {
            base: base.to_string(),
            rates,
            as_of: Utc::now(),
            fallback: true,
        }
    }
}

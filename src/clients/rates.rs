use std::sync::Arc;

use anyhow::{Error, Result};
use reqwest::Method;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::{circuit_breaker::CircuitBreaker, resilient::ResilientClient, transport::Transport},
    config::Config,
    models::{
        error::{CallOutcome, CallSuccess, ErrorKind, StandardError},
        rates::{ExchangeRates, RatesWireResponse},
    },
};

pub const RATES_SERVICE: &str = "exchange_rates";

/// Adapter for the exchange-rates provider. Requires an API key; without
/// one every call fails fast with `UNAUTHORIZED` and neither the retry
/// budget nor the breaker is touched. When the live path is exhausted and
/// fallback is enabled, a pinned rate table tagged `fallback: true` is
/// served instead.
pub struct ExchangeRatesClient {
    transport: Transport,
    resilient: ResilientClient,
    base_url: String,
    api_key: Option<String>,
    base_currency: String,
    fallback_enabled: bool,
}

impl ExchangeRatesClient {
    pub fn new(config: &Config, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, Error> {
        let transport = Transport::new(config.request_timeout_ms)?;
        let resilient = ResilientClient::new(circuit_breaker, config.retry_policy());

        info!(base_url = %config.rates_base_url, "Exchange rates client initialized");

        Ok(Self {
            transport,
            resilient,
            base_url: config.rates_base_url.clone(),
            api_key: config.rates_api_key.clone(),
            base_currency: config.rates_base_currency.clone(),
            fallback_enabled: config.rates_fallback_enabled,
        })
    }

    pub async fn fetch_latest(&self) -> CallOutcome<ExchangeRates> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(service = RATES_SERVICE, "Credential absent, failing fast");
            return Err(StandardError::missing_credential(RATES_SERVICE));
        };

        let url = format!("{}/v1/latest?base={}", self.base_url, self.base_currency);
        let trace_id = Uuid::new_v4().to_string();
        let headers = vec![
            ("X-Api-Key".to_string(), api_key.to_string()),
            ("X-Trace-Id".to_string(), trace_id.clone()),
        ];

        debug!(service = RATES_SERVICE, trace_id = %trace_id, "Fetching latest exchange rates");

        let outcome = self
            .resilient
            .call(|| {
                self.transport
                    .request::<RatesWireResponse>(Method::GET, &url, &headers)
            })
            .await;

        match outcome {
            Ok(success) => Ok(CallSuccess {
                data: ExchangeRates::from_wire(success.data),
                status: success.status,
            }),
            Err(err) if self.fallback_enabled && exhausted(&err) => {
                if err.kind == ErrorKind::CircuitOpen {
                    debug!(service = RATES_SERVICE, "Circuit open, serving fallback rates");
                } else {
                    warn!(
                        service = RATES_SERVICE,
                        kind = err.kind.as_str(),
                        "Retries exhausted, serving fallback rates"
                    );
                }

                Ok(CallSuccess {
                    data: ExchangeRates::fallback_table(&self.base_currency),
                    status: 200,
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// The live path counts as exhausted when the breaker rejected the call or
/// a retryable failure survived the whole retry budget. Terminal
/// classifications (bad request, not found) are real answers and surface
/// as errors rather than being papered over with a fallback.
pub(crate) fn exhausted(err: &StandardError) -> bool {
    err.kind == ErrorKind::CircuitOpen || err.retryable
}

use std::sync::Arc;

use anyhow::{Error, Result};
use tracing_subscriber::EnvFilter;

use outbound_service::{
    api::{AppState, run_api_server},
    clients::{
        circuit_breaker::{CircuitBreakerRegistry, TracingObserver},
        github::{GITHUB_SERVICE, GithubStatsClient},
        health::HealthChecker,
        rates::{ExchangeRatesClient, RATES_SERVICE},
    },
    config::Config,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load()?;

    let registry = Arc::new(CircuitBreakerRegistry::new(
        config.circuit_breaker_config(),
        Arc::new(TracingObserver),
    ));

    let rates = ExchangeRatesClient::new(&config, registry.get_or_create(RATES_SERVICE))?;
    let github = GithubStatsClient::new(&config, registry.get_or_create(GITHUB_SERVICE))?;

    let state = Arc::new(AppState {
        health_checker: HealthChecker::new(Arc::clone(&registry)),
        registry,
        rates,
        github,
    });

    run_api_server(state, config.server_port)
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {}", e))?;

    Ok(())
}

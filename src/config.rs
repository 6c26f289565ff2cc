use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::{circuit_breaker::CircuitBreakerConfig, retry::RetryPolicy};

/// Environment-driven configuration. Every resilience knob has a default;
/// provider credentials are optional and their absence switches the
/// corresponding adapter into fail-fast mode.
#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_rates_base_url")]
    pub rates_base_url: String,
    pub rates_api_key: Option<String>,

    #[serde(default = "default_base_currency")]
    pub rates_base_currency: String,

    #[serde(default = "default_true")]
    pub rates_fallback_enabled: bool,

    #[serde(default = "default_github_base_url")]
    pub github_base_url: String,
    pub github_token: Option<String>,

    #[serde(default)]
    pub github_fallback_enabled: bool,

    #[serde(default = "default_failure_threshold")]
    pub circuit_breaker_failure_threshold: u32,

    #[serde(default = "default_success_threshold")]
    pub circuit_breaker_success_threshold: u32,

    #[serde(default = "default_open_duration_ms")]
    pub circuit_breaker_open_duration_ms: u64,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

fn default_rates_base_url() -> String {
    "https://api.exchangerate.host".to_string()
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_success_threshold() -> u32 {
    2
}

fn default_open_duration_ms() -> u64 {
    30_000
}

fn default_retry_count() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    200
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_server_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|_| anyhow!("Invalid or missing environmental variable"))?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_count,
            base_backoff_ms: self.base_backoff_ms,
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_failure_threshold,
            success_threshold: self.circuit_breaker_success_threshold,
            open_duration_ms: self.circuit_breaker_open_duration_ms,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_duration_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_duration_ms: 30_000,
        }
    }
}

/// Point-in-time snapshot of one breaker, shaped for the status API.
/// `failure_count` is meaningful only while closed, `success_count` only
/// while half-open.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStatus {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,

    pub remaining_ms: u64,
}

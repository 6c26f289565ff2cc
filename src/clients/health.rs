use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::{
    clients::circuit_breaker::CircuitBreakerRegistry,
    models::{
        circuit_breaker::CircuitState,
        health::{HealthCheckResponse, HealthStatus, ServiceHealth},
    },
};

/// Derives per-dependency health from breaker snapshots. A dependency is
/// degraded while its circuit is anything but closed; the service as a
/// whole never reports unhealthy because of a dependency (every failure
/// path here ends in an error result or a fallback, not an outage).
pub struct HealthChecker {
    registry: Arc<CircuitBreakerRegistry>,
}

impl HealthChecker {
    pub fn new(registry: Arc<CircuitBreakerRegistry>) -> Self {
        Self { registry }
    }

    pub fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        for status in self.registry.statuses() {
            let state_str = status.state.as_str().to_string();
            debug!(
                service = %status.service,
                circuit_state = %state_str,
                "Circuit breaker state checked"
            );

            let health = match status.state {
                CircuitState::Closed => ServiceHealth::healthy(state_str),
                CircuitState::HalfOpen => ServiceHealth::degraded(
                    state_str,
                    "Circuit breaker in recovery mode".to_string(),
                ),
                CircuitState::Open => ServiceHealth::degraded(
                    state_str,
                    format!("Circuit open for another {}ms", status.remaining_ms),
                ),
            };

            checks.insert(status.service, health);
        }

        let status = Self::determine_overall_status(&checks);

        HealthCheckResponse {
            status,
            timestamp: Utc::now(),
            checks,
        }
    }

    fn determine_overall_status(checks: &HashMap<String, ServiceHealth>) -> HealthStatus {
        let has_degraded = checks
            .values()
            .any(|health| health.status != HealthStatus::Healthy);

        if has_degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

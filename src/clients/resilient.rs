use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use crate::clients::circuit_breaker::CircuitBreaker;
use crate::models::error::CallOutcome;
use crate::models::retry::RetryPolicy;

/// Wraps one logical call in the retry loop and the circuit breaker.
///
/// The breaker sits outside the loop, so however many physical attempts a
/// call burns through, the breaker records exactly one outcome. Transient
/// blips retried away inside a call never move the failure counter; only
/// whole logical calls do.
pub struct ResilientClient {
    circuit_breaker: Arc<CircuitBreaker>,
    retry_policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, retry_policy: RetryPolicy) -> Self {
        Self {
            circuit_breaker,
            retry_policy,
        }
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// One logical call with the policy's default retry budget.
    pub async fn call<F, Fut, T>(&self, request_fn: F) -> CallOutcome<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = CallOutcome<T>>,
    {
        self.call_with_retries(request_fn, self.retry_policy.max_retries)
            .await
    }

    /// One logical call with an explicit retry budget. Total physical
    /// attempts never exceed `retries + 1`; a non-retryable failure ends
    /// the call on the attempt that produced it.
    pub async fn call_with_retries<F, Fut, T>(&self, request_fn: F, retries: u32) -> CallOutcome<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = CallOutcome<T>>,
    {
        self.circuit_breaker
            .execute(|| self.attempt(request_fn, retries))
            .await
    }

    async fn attempt<F, Fut, T>(&self, request_fn: F, retries: u32) -> CallOutcome<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = CallOutcome<T>>,
    {
        let service = self.circuit_breaker.service_name();
        let mut retries_left = retries;

        loop {
            match request_fn().await {
                Ok(success) => {
                    if retries_left < retries {
                        debug!(
                            service,
                            attempts = retries - retries_left + 1,
                            "Call succeeded after retry"
                        );
                    }
                    return Ok(success);
                }
                Err(err) if err.retryable && retries_left > 0 => {
                    let delay_ms = self.retry_policy.backoff_ms(retries_left);
                    debug!(
                        service,
                        kind = err.kind.as_str(),
                        retries_left,
                        delay_ms,
                        "Retryable failure, backing off"
                    );

                    sleep(Duration::from_millis(delay_ms)).await;
                    retries_left -= 1;
                }
                Err(err) => {
                    warn!(
                        service,
                        kind = err.kind.as_str(),
                        retryable = err.retryable,
                        attempts = retries - retries_left + 1,
                        "Call failed",
                    );
                    return Err(err);
                }
            }
        }
    }
}

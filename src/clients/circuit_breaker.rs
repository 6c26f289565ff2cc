use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerStatus, CircuitState};
use crate::models::error::{CallOutcome, StandardError};

/// Telemetry hook for breaker activity. The state machine itself performs
/// no I/O; whatever logging or metrics a deployment wants lives behind
/// this trait.
pub trait BreakerObserver: Send + Sync {
    fn on_state_change(&self, service: &str, from: CircuitState, to: CircuitState);

    fn on_outcome(&self, service: &str, state: CircuitState, success: bool) {
        let _ = (service, state, success);
    }
}

/// Default observer: structured logs, `warn!` when a circuit opens.
pub struct TracingObserver;

impl BreakerObserver for TracingObserver {
    fn on_state_change(&self, service: &str, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => warn!(
                service,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => info!(
                service,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit breaker attempting recovery"
            ),
            CircuitState::Closed => info!(
                service,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit breaker closed"
            ),
        }
    }

    fn on_outcome(&self, service: &str, state: CircuitState, success: bool) {
        debug!(
            service,
            state = state.as_str(),
            success,
            "Circuit breaker outcome recorded"
        );
    }
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    open_deadline: Option<Instant>,
    next_attempt_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            open_deadline: None,
            next_attempt_at: None,
            last_error: None,
        }
    }

    fn remaining_ms(&self, now: Instant) -> u64 {
        self.open_deadline
            .map(|deadline| deadline.saturating_duration_since(now).as_millis() as u64)
            .unwrap_or(0)
    }

    fn trip_open(&mut self, open_duration_ms: u64, now: Instant) {
        self.state = CircuitState::Open;
        self.success_count = 0;
        self.open_deadline = Some(now + Duration::from_millis(open_duration_ms));
        self.next_attempt_at =
            Some(Utc::now() + chrono::Duration::milliseconds(open_duration_ms as i64));
    }
}

/// One breaker per external dependency, shared by every logical call to
/// that dependency for the process lifetime. All transitions happen under
/// the inner mutex; the lock is never held across an await, so admission
/// and outcome recording are each a single atomic step and two callers
/// cannot drive the same transition twice.
pub struct CircuitBreaker {
    service_name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    observer: Option<Arc<dyn BreakerObserver>>,
}

impl CircuitBreaker {
    pub fn new(service_name: String, config: CircuitBreakerConfig) -> Self {
        info!(service = %service_name, "Circuit breaker initialized");

        Self {
            service_name,
            config,
            inner: Mutex::new(Inner::new()),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BreakerObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Runs one logical call through the breaker. While open and before
    /// the deadline the operation is never invoked; the rejection carries
    /// the `CIRCUIT_OPEN` kind, the time remaining, and the last recorded
    /// error. At the deadline the breaker flips to half-open first and
    /// the operation runs as the probe.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> CallOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CallOutcome<T>>,
    {
        if let Err(rejection) = self.admit() {
            return Err(rejection);
        }

        let outcome = operation().await;

        match &outcome {
            Ok(_) => self.record_success(),
            Err(err) => self.record_failure(err),
        }

        outcome
    }

    fn admit(&self) -> Result<(), StandardError> {
        let transition;
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();

            match inner.state {
                CircuitState::Closed | CircuitState::HalfOpen => return Ok(()),
                CircuitState::Open => {
                    let remaining = inner.remaining_ms(now);
                    if remaining > 0 {
                        return Err(StandardError::circuit_open(
                            &self.service_name,
                            remaining,
                            inner.last_error.as_deref(),
                        ));
                    }

                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    transition = (CircuitState::Open, CircuitState::HalfOpen);
                }
            }
        }

        self.notify(transition.0, transition.1);
        Ok(())
    }

    fn record_success(&self) {
        let mut transition = None;
        let state;
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

            match inner.state {
                CircuitState::HalfOpen => {
                    inner.success_count += 1;
                    if inner.success_count >= self.config.success_threshold {
                        inner.state = CircuitState::Closed;
                        inner.failure_count = 0;
                        inner.success_count = 0;
                        inner.open_deadline = None;
                        inner.next_attempt_at = None;
                        inner.last_error = None;
                        transition = Some((CircuitState::HalfOpen, CircuitState::Closed));
                    }
                }
                CircuitState::Closed => {
                    inner.failure_count = 0;
                }
                // Straggler outcome from a call admitted before the trip.
                CircuitState::Open => {}
            }

            state = inner.state;
        }

        if let Some((from, to)) = transition {
            self.notify(from, to);
        }
        if let Some(observer) = &self.observer {
            observer.on_outcome(&self.service_name, state, true);
        }
    }

    fn record_failure(&self, err: &StandardError) {
        let mut transition = None;
        let state;
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            inner.last_error = Some(err.message.clone());

            match inner.state {
                // Single strike while half-open: any failure reopens.
                CircuitState::HalfOpen => {
                    inner.trip_open(self.config.open_duration_ms, now);
                    transition = Some((CircuitState::HalfOpen, CircuitState::Open));
                }
                CircuitState::Closed => {
                    inner.failure_count += 1;
                    if inner.failure_count >= self.config.failure_threshold {
                        inner.trip_open(self.config.open_duration_ms, now);
                        transition = Some((CircuitState::Closed, CircuitState::Open));
                    }
                }
                CircuitState::Open => {}
            }

            state = inner.state;
        }

        if let Some((from, to)) = transition {
            self.notify(from, to);
        }
        if let Some(observer) = &self.observer {
            observer.on_outcome(&self.service_name, state, false);
        }
    }

    /// Manual override: force closed and zero everything.
    pub fn reset(&self) {
        let transition;
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let from = inner.state;
            *inner = Inner::new();
            transition = (from != CircuitState::Closed).then_some((from, CircuitState::Closed));
        }

        if let Some((from, to)) = transition {
            self.notify(from, to);
        }
        info!(service = %self.service_name, "Circuit breaker manually reset");
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        CircuitBreakerStatus {
            service: self.service_name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            next_attempt_at: inner.next_attempt_at,
            remaining_ms: inner.remaining_ms(Instant::now()),
        }
    }

    fn notify(&self, from: CircuitState, to: CircuitState) {
        if let Some(observer) = &self.observer {
            observer.on_state_change(&self.service_name, from, to);
        }
    }
}

/// Hands out the single shared breaker per dependency name. Adapters ask
/// here instead of holding module-level singletons.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    observer: Arc<dyn BreakerObserver>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig, observer: Arc<dyn BreakerObserver>) -> Self {
        Self {
            config,
            observer,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, service_name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());

        Arc::clone(breakers.entry(service_name.to_string()).or_insert_with(|| {
            Arc::new(
                CircuitBreaker::new(service_name.to_string(), self.config.clone())
                    .with_observer(Arc::clone(&self.observer)),
            )
        }))
    }

    pub fn get(&self, service_name: &str) -> Option<Arc<CircuitBreaker>> {
        let breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        breakers.get(service_name).cloned()
    }

    pub fn statuses(&self) -> Vec<CircuitBreakerStatus> {
        let breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        let mut statuses: Vec<_> = breakers.values().map(|b| b.status()).collect();
        statuses.sort_by(|a, b| a.service.cmp(&b.service));
        statuses
    }
}

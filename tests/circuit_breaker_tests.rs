use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};

use outbound_service::clients::circuit_breaker::{BreakerObserver, CircuitBreaker};
use outbound_service::models::circuit_breaker::{CircuitBreakerConfig, CircuitState};
use outbound_service::models::error::{CallOutcome, CallSuccess, ErrorKind, StandardError};
use tokio::time::{Duration, sleep};

fn breaker(failure_threshold: u32, success_threshold: u32, open_duration_ms: u64) -> CircuitBreaker {
    CircuitBreaker::new(
        "test_service".to_string(),
        CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            open_duration_ms,
        },
    )
}

async fn failing_call(breaker: &CircuitBreaker, invocations: &Arc<AtomicU32>) -> CallOutcome<()> {
    breaker
        .execute(|| {
            let invocations = Arc::clone(invocations);
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Err(StandardError::from_status(503, "Service unavailable"))
            }
        })
        .await
}

async fn succeeding_call(breaker: &CircuitBreaker, invocations: &Arc<AtomicU32>) -> CallOutcome<()> {
    breaker
        .execute(|| {
            let invocations = Arc::clone(invocations);
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(CallSuccess {
                    data: (),
                    status: 200,
                })
            }
        })
        .await
}

/// Test: exactly failure_threshold consecutive failed calls trip the breaker
#[tokio::test]
async fn test_opens_after_failure_threshold() {
    let breaker = breaker(3, 2, 60_000);
    let invocations = Arc::new(AtomicU32::new(0));

    for expected in 1..=2 {
        let _ = failing_call(&breaker, &invocations).await;
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.failure_count, expected);
    }

    let _ = failing_call(&breaker, &invocations).await;

    let status = breaker.status();
    assert_eq!(status.state, CircuitState::Open);
    assert!(status.remaining_ms > 0);
    assert!(status.next_attempt_at.is_some());
}

/// Test: success while closed fully resets the failure counter
#[tokio::test]
async fn test_success_resets_failure_count_while_closed() {
    let breaker = breaker(3, 2, 60_000);
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    let _ = failing_call(&breaker, &invocations).await;
    assert_eq!(breaker.status().failure_count, 2);

    let _ = succeeding_call(&breaker, &invocations).await;

    let status = breaker.status();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);
}

/// Test: while open and before the deadline the operation is never invoked
#[tokio::test]
async fn test_open_rejects_without_invoking_operation() {
    let breaker = breaker(1, 2, 60_000);
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    assert_eq!(breaker.status().state, CircuitState::Open);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    let result = failing_call(&breaker, &invocations).await;

    let err = result.err().expect("open breaker must reject");
    assert_eq!(err.kind, ErrorKind::CircuitOpen);
    assert!(!err.retryable);
    assert!(err.message.contains("test_service"));
    assert_eq!(
        invocations.load(Ordering::SeqCst),
        1,
        "Operation must not run while circuit is open"
    );
}

/// Test: the open rejection carries the last underlying error
#[tokio::test]
async fn test_open_rejection_includes_last_error() {
    let breaker = breaker(1, 2, 60_000);
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    let err = failing_call(&breaker, &invocations)
        .await
        .err()
        .expect("open breaker must reject");

    assert!(err.message.contains("Service unavailable"));
}

/// Test: after open_duration elapses the next call runs as a half-open probe
#[tokio::test]
async fn test_half_open_probe_after_deadline() {
    let breaker = breaker(1, 2, 100);
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    assert_eq!(breaker.status().state, CircuitState::Open);

    sleep(Duration::from_millis(150)).await;

    let result = succeeding_call(&breaker, &invocations).await;
    assert!(result.is_ok());
    assert_eq!(invocations.load(Ordering::SeqCst), 2, "Probe runs exactly once");

    let status = breaker.status();
    assert_eq!(status.state, CircuitState::HalfOpen);
    assert_eq!(status.success_count, 1);
}

/// Test: any single failure while half-open reopens immediately
#[tokio::test]
async fn test_half_open_single_strike_reopens() {
    let breaker = breaker(1, 5, 100);
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    sleep(Duration::from_millis(150)).await;

    let _ = succeeding_call(&breaker, &invocations).await;
    assert_eq!(breaker.status().success_count, 1);

    let _ = failing_call(&breaker, &invocations).await;

    let status = breaker.status();
    assert_eq!(status.state, CircuitState::Open);
    assert_eq!(status.success_count, 0, "Reopening zeroes the success counter");
    assert!(status.remaining_ms > 0, "Reopening sets a fresh deadline");
}

/// Test: success_threshold consecutive successes while half-open close the circuit
#[tokio::test]
async fn test_closes_after_success_threshold() {
    let breaker = breaker(1, 2, 100);
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    sleep(Duration::from_millis(150)).await;

    let _ = succeeding_call(&breaker, &invocations).await;
    assert_eq!(breaker.status().state, CircuitState::HalfOpen);

    let _ = succeeding_call(&breaker, &invocations).await;

    let status = breaker.status();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);
    assert_eq!(status.success_count, 0);
    assert_eq!(status.remaining_ms, 0);
}

/// Test: reset forces closed and zeroes everything regardless of prior state
#[tokio::test]
async fn test_reset_from_any_state() {
    let breaker = breaker(1, 2, 60_000);
    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    assert_eq!(breaker.status().state, CircuitState::Open);

    breaker.reset();

    let status = breaker.status();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);
    assert_eq!(status.success_count, 0);
    assert_eq!(status.remaining_ms, 0);
    assert!(status.next_attempt_at.is_none());

    // And the breaker admits calls again right away.
    let result = succeeding_call(&breaker, &invocations).await;
    assert!(result.is_ok());
}

/// Test: full recovery scenario — trip, reject, probe, close
#[tokio::test]
async fn test_trip_reject_probe_close_scenario() {
    let breaker = breaker(3, 2, 300);
    let invocations = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
        let _ = failing_call(&breaker, &invocations).await;
    }
    assert_eq!(breaker.status().state, CircuitState::Open);

    let rejected = failing_call(&breaker, &invocations).await;
    assert_eq!(rejected.err().map(|e| e.kind), Some(ErrorKind::CircuitOpen));
    assert_eq!(invocations.load(Ordering::SeqCst), 3, "Rejection invokes nothing");

    sleep(Duration::from_millis(350)).await;

    let _ = succeeding_call(&breaker, &invocations).await;
    let status = breaker.status();
    assert_eq!(status.state, CircuitState::HalfOpen);
    assert_eq!(status.success_count, 1);

    let _ = succeeding_call(&breaker, &invocations).await;
    let status = breaker.status();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);
    assert_eq!(status.success_count, 0);
}

struct RecordingObserver {
    transitions: Mutex<Vec<(CircuitState, CircuitState)>>,
}

impl BreakerObserver for RecordingObserver {
    fn on_state_change(&self, _service: &str, from: CircuitState, to: CircuitState) {
        self.transitions.lock().unwrap().push((from, to));
    }
}

/// Test: concurrent callers after the deadline drive exactly one
/// open-to-half-open transition
#[tokio::test]
async fn test_concurrent_callers_single_half_open_transition() {
    let observer = Arc::new(RecordingObserver {
        transitions: Mutex::new(Vec::new()),
    });

    let breaker = Arc::new(
        CircuitBreaker::new(
            "test_service".to_string(),
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 100,
                open_duration_ms: 100,
            },
        )
        .with_observer(Arc::clone(&observer) as Arc<dyn BreakerObserver>),
    );

    let invocations = Arc::new(AtomicU32::new(0));
    let _ = failing_call(&breaker, &invocations).await;

    sleep(Duration::from_millis(150)).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let breaker = Arc::clone(&breaker);
        let invocations = Arc::clone(&invocations);
        handles.push(tokio::spawn(async move {
            succeeding_call(&breaker, &invocations).await
        }));
    }
    futures_util::future::join_all(handles).await;

    let transitions = observer.transitions.lock().unwrap();
    let half_open_flips = transitions
        .iter()
        .filter(|(from, to)| *from == CircuitState::Open && *to == CircuitState::HalfOpen)
        .count();

    assert_eq!(
        half_open_flips, 1,
        "Only one caller may drive the half-open transition"
    );
}

/// Test: state change observer sees the trip and the recovery
#[tokio::test]
async fn test_observer_sees_full_cycle() {
    let observer = Arc::new(RecordingObserver {
        transitions: Mutex::new(Vec::new()),
    });

    let breaker = CircuitBreaker::new(
        "test_service".to_string(),
        CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            open_duration_ms: 100,
        },
    )
    .with_observer(Arc::clone(&observer) as Arc<dyn BreakerObserver>);

    let invocations = Arc::new(AtomicU32::new(0));

    let _ = failing_call(&breaker, &invocations).await;
    sleep(Duration::from_millis(150)).await;
    let _ = succeeding_call(&breaker, &invocations).await;

    let transitions = observer.transitions.lock().unwrap().clone();
    assert_eq!(
        transitions,
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::HalfOpen),
            (CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    clients::{
        circuit_breaker::CircuitBreakerRegistry, github::GithubStatsClient, health::HealthChecker,
        rates::ExchangeRatesClient,
    },
    models::{
        error::{ErrorKind, StandardError},
        health::HealthStatus,
    },
};

pub struct AppState {
    pub health_checker: HealthChecker,
    pub registry: Arc<CircuitBreakerRegistry>,
    pub rates: ExchangeRatesClient,
    pub github: GithubStatsClient,
}

pub async fn run_api_server(
    state: Arc<AppState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "API server started");

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/circuits", get(circuit_statuses))
        .route("/circuits/{name}/reset", post(reset_circuit))
        .route("/rates", get(latest_rates))
        .route("/repos/{owner}/{repo}", get(repo_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all();

    let status_code = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn circuit_statuses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.statuses())
}

async fn reset_circuit(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&name) {
        Some(breaker) => {
            breaker.reset();
            (StatusCode::OK, Json(breaker.status())).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn latest_rates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.rates.fetch_latest().await {
        Ok(success) => (StatusCode::OK, Json(success.data)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn repo_stats(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.github.fetch_repo(&owner, &repo).await {
        Ok(success) => (StatusCode::OK, Json(success.data)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: StandardError) -> axum::response::Response {
    let status = match err.kind {
        ErrorKind::CircuitOpen | ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::NetworkError | ErrorKind::BadGateway => StatusCode::BAD_GATEWAY,
        ErrorKind::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::InternalServerError | ErrorKind::UnknownError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(err)).into_response()
}

use std::sync::Arc;

use anyhow::{Error, Result};
use reqwest::Method;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::{
        circuit_breaker::CircuitBreaker, rates::exhausted, resilient::ResilientClient,
        transport::Transport,
    },
    config::Config,
    models::{
        error::{CallOutcome, CallSuccess, ErrorKind, StandardError},
        github::{RepoStats, RepoWireResponse},
    },
};

pub const GITHUB_SERVICE: &str = "github_stats";

/// Adapter for the repository-stats provider. Fallback is off by default
/// for this capability, so an exhausted call path surfaces the classified
/// error instead of a degraded payload.
pub struct GithubStatsClient {
    transport: Transport,
    resilient: ResilientClient,
    base_url: String,
    token: Option<String>,
    fallback_enabled: bool,
}

impl GithubStatsClient {
    pub fn new(config: &Config, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, Error> {
        let transport = Transport::new(config.request_timeout_ms)?;
        let resilient = ResilientClient::new(circuit_breaker, config.retry_policy());

        info!(base_url = %config.github_base_url, "GitHub stats client initialized");

        Ok(Self {
            transport,
            resilient,
            base_url: config.github_base_url.clone(),
            token: config.github_token.clone(),
            fallback_enabled: config.github_fallback_enabled,
        })
    }

    pub async fn fetch_repo(&self, owner: &str, repo: &str) -> CallOutcome<RepoStats> {
        let Some(token) = self.token.as_deref() else {
            debug!(service = GITHUB_SERVICE, "Credential absent, failing fast");
            return Err(StandardError::missing_credential(GITHUB_SERVICE));
        };

        let url = format!("{}/repos/{}/{}", self.base_url, owner, repo);
        let trace_id = Uuid::new_v4().to_string();
        let headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", token)),
            ("User-Agent".to_string(), "outbound-service".to_string()),
            ("X-Trace-Id".to_string(), trace_id.clone()),
        ];

        debug!(
            service = GITHUB_SERVICE,
            owner,
            repo,
            trace_id = %trace_id,
            "Fetching repository stats"
        );

        let outcome = self
            .resilient
            .call(|| {
                self.transport
                    .request::<RepoWireResponse>(Method::GET, &url, &headers)
            })
            .await;

        match outcome {
            Ok(success) => Ok(CallSuccess {
                data: RepoStats::from_wire(success.data),
                status: success.status,
            }),
            Err(err) if self.fallback_enabled && exhausted(&err) => {
                if err.kind == ErrorKind::CircuitOpen {
                    debug!(service = GITHUB_SERVICE, "Circuit open, serving fallback stats");
                } else {
                    warn!(
                        service = GITHUB_SERVICE,
                        kind = err.kind.as_str(),
                        "Retries exhausted, serving fallback stats"
                    );
                }

                Ok(CallSuccess {
                    data: RepoStats::fallback_for(owner, repo),
                    status: 200,
                })
            }
            Err(err) => Err(err),
        }
    }
}

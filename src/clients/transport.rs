use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::error::{CallOutcome, CallSuccess, StandardError};

/// The one place raw transport errors exist. Every request leaving the
/// process goes through here and comes back as a `CallOutcome`, with
/// reqwest failures and non-2xx statuses already classified.
pub struct Transport {
    http_client: Client,
}

impl Transport {
    pub fn new(timeout_ms: u64) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        Ok(Self { http_client })
    }

    /// One physical attempt: send, classify, decode. Exceeding the client
    /// timeout surfaces as a retryable `NETWORK_ERROR`.
    pub async fn request<T>(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
    ) -> CallOutcome<T>
    where
        T: DeserializeOwned,
    {
        debug!(%method, url, "Sending outbound request");

        let mut request = self.http_client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StandardError::from_transport(&e))?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut err =
                StandardError::from_status(status, format!("Provider returned status {}", status));
            if let Ok(details) = serde_json::from_str(&body) {
                err = err.with_details(details);
            }
            return Err(err);
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| StandardError::from_transport(&e))?;

        Ok(CallSuccess { data, status })
    }
}

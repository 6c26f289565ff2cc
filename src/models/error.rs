use serde::Serialize;
use thiserror::Error;

/// Closed taxonomy every failure in the outbound layer is normalized into.
/// No raw transport-library error type crosses past `clients::transport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    CircuitOpen,
    NetworkError,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CircuitOpen => "CIRCUIT_OPEN",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorKind::BadGateway => "BAD_GATEWAY",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::GatewayTimeout => "GATEWAY_TIMEOUT",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct StandardError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StandardError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            http_status: None,
            details: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Classifies an HTTP status code per the fixed table. Only 429, 502,
    /// 503 and 504 are retryable; every other 4xx/5xx is terminal on the
    /// first attempt.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let (kind, retryable) = match status {
            400 => (ErrorKind::BadRequest, false),
            401 => (ErrorKind::Unauthorized, false),
            403 => (ErrorKind::Forbidden, false),
            404 => (ErrorKind::NotFound, false),
            429 => (ErrorKind::RateLimited, true),
            500 => (ErrorKind::InternalServerError, false),
            502 => (ErrorKind::BadGateway, true),
            503 => (ErrorKind::ServiceUnavailable, true),
            504 => (ErrorKind::GatewayTimeout, true),
            _ => (ErrorKind::UnknownError, false),
        };

        Self::new(kind, message, retryable).with_status(status)
    }

    /// Classifies a transport-level failure. Anything without a response
    /// status (connection reset, DNS failure, timeout) is a retryable
    /// network error; a response error carries its status through the
    /// status table.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }

        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return Self::new(ErrorKind::NetworkError, err.to_string(), true);
        }

        Self::new(ErrorKind::UnknownError, err.to_string(), false)
    }

    /// Rejection emitted when a breaker refuses to admit a call. Distinct
    /// from any transport kind so callers can avoid logging it as a fresh
    /// incident.
    pub fn circuit_open(service_name: &str, remaining_ms: u64, last_error: Option<&str>) -> Self {
        let message = match last_error {
            Some(last) => format!(
                "Circuit breaker is open for {} (last error: {})",
                service_name, last
            ),
            None => format!("Circuit breaker is open for {}", service_name),
        };

        Self::new(ErrorKind::CircuitOpen, message, false)
            .with_details(serde_json::json!({ "remaining_ms": remaining_ms }))
    }

    pub fn missing_credential(service_name: &str) -> Self {
        Self::new(
            ErrorKind::Unauthorized,
            format!("No credential configured for {}", service_name),
            false,
        )
    }
}

/// Successful side of one logical call.
#[derive(Debug, Clone)]
pub struct CallSuccess<T> {
    pub data: T,
    pub status: u16,
}

/// Outcome of one logical call: either data with the responding status, or
/// a classified failure. Exactly one outcome per logical call reaches the
/// circuit breaker, however many physical attempts it took.
pub type CallOutcome<T> = Result<CallSuccess<T>, StandardError>;

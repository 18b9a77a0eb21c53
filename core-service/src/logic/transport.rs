//! Outbound HTTP
//!
//! The shield only ever needs two calls: GET the pattern catalog and POST a
//! telemetry event, both authenticated with `x-api-key`. Hosts can swap the
//! blocking `ureq` implementation for their own client.

use std::time::Duration;

/// Status + body of a completed exchange (any status, including 4xx/5xx)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connect / DNS / TLS failure
    Network(String),
    /// Request exceeded its timeout
    Timeout,
    /// Response body could not be read
    Body(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Body(e) => write!(f, "Unreadable response body: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

/// Blocking HTTP client used by the catalog source and telemetry emitter
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, api_key: &str, timeout: Duration) -> Result<HttpReply, TransportError>;

    fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &str,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError>;
}

// ============================================================================
// UREQ TRANSPORT
// ============================================================================

/// Default transport backed by `ureq`
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn finish(result: Result<ureq::Response, ureq::Error>) -> Result<HttpReply, TransportError> {
        match result {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| TransportError::Body(e.to_string()))?;
                Ok(HttpReply { status, body })
            }
            // Non-2xx still carries a body worth logging
            Err(ureq::Error::Status(status, response)) => Ok(HttpReply {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(t)) => {
                let message = t.to_string();
                if message.to_lowercase().contains("timed out") {
                    Err(TransportError::Timeout)
                } else {
                    Err(TransportError::Network(message))
                }
            }
        }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, api_key: &str, timeout: Duration) -> Result<HttpReply, TransportError> {
        let result = ureq::get(url)
            .timeout(timeout)
            .set("x-api-key", api_key)
            .call();
        Self::finish(result)
    }

    fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &str,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let result = ureq::post(url)
            .timeout(timeout)
            .set("Content-Type", "application/json")
            .set("x-api-key", api_key)
            .send_string(body);
        Self::finish(result)
    }
}

// ============================================================================
// TEST DOUBLE
// ============================================================================

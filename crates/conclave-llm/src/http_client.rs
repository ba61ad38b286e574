//! Shared HTTP client for backend connectors
//!
//! One `reqwest::Client` is built per process and shared by every backend so
//! connections are pooled. Each call is a single attempt: the only retry a
//! backend ever makes is through its fallback route.

use conclave_error_redaction::redact_error_message;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::LlmError;

/// Connect timeout for every backend endpoint
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for any single request, regardless of the caller's timeout
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(3600);

/// Error bodies are cut to this many characters before they reach an error message
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Shared HTTP client for backend connectors
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// Create a new HTTP client with a custom maximum timeout
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_timeout,
        })
    }

    /// Start a POST request against `url` using the pooled client.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request once and map failures onto `LlmError`.
    ///
    /// - 401/403 → `ProviderAuth`
    /// - 429 → `ProviderQuota`
    /// - other 4xx → `Transport`
    /// - 5xx → `ProviderOutage`
    /// - elapsed request timeout → `Timeout`
    /// - connection failures → `Transport`
    ///
    /// # Errors
    ///
    /// See the mapping above.
    pub async fn execute(
        &self,
        request_builder: RequestBuilder,
        request_timeout: Duration,
        backend_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let request = request_builder
            .timeout(effective_timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to build request: {e}")))?;

        debug!(
            backend = backend_name,
            url = %request.url(),
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(LlmError::Timeout {
                    duration: effective_timeout,
                });
            }
            Err(e) => {
                return Err(LlmError::Transport(format!(
                    "{backend_name} request failed: {}",
                    redact_error_message(&e.to_string())
                )));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status_error(status, backend_name, &body))
    }
}

/// Map a non-success HTTP status to the matching `LlmError` variant
fn map_status_error(status: StatusCode, backend_name: &str, body: &str) -> LlmError {
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
    let detail = if preview.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", redact_error_message(preview.trim()))
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::ProviderAuth(format!("{backend_name} authentication failed: {detail}"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::ProviderQuota(format!("{backend_name} rate limit exceeded: {detail}"))
        }
        s if s.is_server_error() => {
            LlmError::ProviderOutage(format!("{backend_name} returned server error: {detail}"))
        }
        _ => LlmError::Transport(format!("{backend_name} returned client error: {detail}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_construction() {
        assert!(HttpClient::new().is_ok());
    }

    #[test]
    fn test_map_status_error_variants() {
        assert!(matches!(
            map_status_error(StatusCode::UNAUTHORIZED, "arcee", ""),
            LlmError::ProviderAuth(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::FORBIDDEN, "arcee", ""),
            LlmError::ProviderAuth(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::TOO_MANY_REQUESTS, "arcee", ""),
            LlmError::ProviderQuota(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_GATEWAY, "arcee", ""),
            LlmError::ProviderOutage(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_REQUEST, "arcee", ""),
            LlmError::Transport(_)
        ));
    }

    #[test]
    fn test_map_status_error_redacts_body() {
        let err = map_status_error(
            StatusCode::UNAUTHORIZED,
            "deepseek",
            r#"{"error":"invalid key sk-abcdefghijklmnopqrstuvwxyz123456"}"#,
        );
        let message = err.to_string();
        assert!(message.contains("deepseek"));
        assert!(!message.contains("sk-abcdefghijklmnopqrstuvwxyz123456"));
    }
}

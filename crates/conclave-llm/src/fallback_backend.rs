//! Fallback route wrapper
//!
//! Wraps a primary backend with one secondary route. Any primary failure is
//! retried exactly once through the fallback; callers only see the outer
//! success or failure.
//!
//! The invocation timeout is the budget for both routes together. The
//! primary gets half of it, and the fallback gets whatever the primary left
//! unused, so a hung primary still leaves time for the retry.

use async_trait::async_trait;
use conclave_error_redaction::redact_error_message_for_logging;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, ModelResponse};

pub struct FallbackBackend {
    name: String,
    primary: Arc<dyn LlmBackend>,
    fallback: Arc<dyn LlmBackend>,
}

impl FallbackBackend {
    pub fn new(
        name: impl Into<String>,
        primary: Arc<dyn LlmBackend>,
        fallback: Arc<dyn LlmBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            primary,
            fallback,
        }
    }
}

#[async_trait]
impl LlmBackend for FallbackBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<ModelResponse, LlmError> {
        let started = Instant::now();
        let primary_budget = inv.timeout / 2;
        let mut primary_inv = inv.clone();
        primary_inv.timeout = primary_budget;

        let primary_error =
            match tokio::time::timeout(primary_budget, self.primary.invoke(primary_inv)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => e,
                Err(_) => LlmError::Timeout {
                    duration: primary_budget,
                },
            };

        let primary_message = redact_error_message_for_logging(&primary_error.to_string());
        warn!(
            backend = %self.name,
            error_kind = primary_error.kind(),
            error = %primary_message,
            "Primary route failed, trying fallback route"
        );

        // The fallback route always answers with its own configured model.
        let mut fallback_inv = inv.with_model("");
        fallback_inv.timeout = fallback_inv.timeout.saturating_sub(started.elapsed());
        match self.fallback.invoke(fallback_inv).await {
            Ok(response) => {
                debug!(
                    backend = %self.name,
                    model = %response.model,
                    "Fallback route succeeded"
                );
                Ok(response)
            }
            Err(fallback_error) => Err(LlmError::FallbackExhausted {
                primary: primary_message,
                fallback: redact_error_message_for_logging(&fallback_error.to_string()),
            }),
        }
    }
}

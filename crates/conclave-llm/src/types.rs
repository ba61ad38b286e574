//! Core types for the backend connector

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use conclave_config::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Sampling parameters sent with each request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Input to a backend invocation
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Model override; empty means the backend's configured model
    pub model: String,
    /// Transport-level timeout for this invocation
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    pub params: GenerationParams,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            model: String::new(),
            timeout,
            messages,
            params: GenerationParams::default(),
        }
    }

    /// Build the `[system?, user]` conversation used by every pipeline phase.
    #[must_use]
    pub fn from_prompt(
        prompt: &str,
        system_prompt: Option<&str>,
        params: GenerationParams,
        timeout: Duration,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        Self::new(timeout, messages).with_params(params)
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// One successful completion.
///
/// `usage` holds whatever integer counters the provider reported, keyed by
/// the provider's own names (`prompt_tokens`, `input_tokens`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub model: String,
    #[serde(default)]
    pub usage: BTreeMap<String, u64>,
}

impl ModelResponse {
    #[must_use]
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_usage(mut self, key: impl Into<String>, value: u64) -> Self {
        self.usage.insert(key.into(), value);
        self
    }
}

/// Keep only the non-negative integer counters of a provider usage object.
pub(crate) fn integer_counters(
    usage: Option<BTreeMap<String, serde_json::Value>>,
) -> BTreeMap<String, u64> {
    usage
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.as_u64().map(|v| (key, v)))
        .collect()
}

/// Trait for backend implementations
///
/// Each wire format implements this trait; the ensemble dispatcher works with
/// any of them without knowing the wire shape.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Invoke the backend with the given invocation parameters
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors, timeouts
    /// and responses missing the expected content field.
    async fn invoke(&self, inv: LlmInvocation) -> Result<ModelResponse, LlmError>;

    /// Single-prompt convenience over [`LlmBackend::invoke`].
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        params: GenerationParams,
        timeout: Duration,
    ) -> Result<ModelResponse, LlmError> {
        self.invoke(LlmInvocation::from_prompt(
            prompt,
            system_prompt,
            params,
            timeout,
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_prompt_orders_system_first() {
        let inv = LlmInvocation::from_prompt(
            "fix it",
            Some("be terse"),
            GenerationParams::default(),
            Duration::from_secs(5),
        );
        assert_eq!(inv.messages.len(), 2);
        assert_eq!(inv.messages[0], Message::system("be terse"));
        assert_eq!(inv.messages[1], Message::user("fix it"));
        assert!(inv.model.is_empty());
    }

    #[test]
    fn test_from_prompt_without_system() {
        let inv = LlmInvocation::from_prompt(
            "fix it",
            None,
            GenerationParams::default(),
            Duration::from_secs(5),
        );
        assert_eq!(inv.messages, vec![Message::user("fix it")]);
        assert_eq!(inv.params.temperature, 0.7);
        assert_eq!(inv.params.max_tokens, 4000);
    }

    #[test]
    fn test_integer_counters_drops_non_integers() {
        let usage: BTreeMap<String, serde_json::Value> = serde_json::from_value(json!({
            "prompt_tokens": 12,
            "completion_tokens": 30,
            "cost": 0.002,
            "details": {"cached": 1}
        }))
        .unwrap();

        let counters = integer_counters(Some(usage));
        assert_eq!(counters.len(), 2);
        assert_eq!(counters["prompt_tokens"], 12);
        assert!(integer_counters(None).is_empty());
    }
}

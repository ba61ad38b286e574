//! Anthropic Messages API backend
//!
//! Same uniform request, different wire shape: system prompts travel in a
//! top-level `system` field, the key goes in `x-api-key`, and the generated
//! text is the first `text` content block.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, Message, ModelResponse, Role, integer_counters};

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Backend for Anthropic-style `/messages` endpoints
#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    client: Arc<HttpClient>,
    name: String,
    url: String,
    api_key: String,
    default_model: String,
}

impl AnthropicBackend {
    /// Create a backend for `{endpoint}/messages`.
    pub fn new(
        client: Arc<HttpClient>,
        name: impl Into<String>,
        endpoint: &str,
        api_key: String,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            url: format!("{}/messages", endpoint.trim_end_matches('/')),
            api_key,
            default_model: default_model.into(),
        }
    }

    fn resolve_model(&self, inv: &LlmInvocation) -> String {
        if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        }
    }

    /// Split system messages out of the conversation.
    ///
    /// Multiple system messages are joined with a blank line.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut anthropic_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(existing) = system_prompt.as_mut() {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    } else {
                        system_prompt = Some(msg.content.clone());
                    }
                }
                Role::User => anthropic_messages.push(AnthropicMessage {
                    role: "user",
                    content: msg.content.clone(),
                }),
                Role::Assistant => anthropic_messages.push(AnthropicMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                }),
            }
        }

        (system_prompt, anthropic_messages)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<ModelResponse, LlmError> {
        let model = self.resolve_model(&inv);

        debug!(
            backend = %self.name,
            model = %model,
            max_tokens = inv.params.max_tokens,
            temperature = inv.params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic messages backend"
        );

        let (system, messages) = Self::convert_messages(&inv.messages);

        let request_body = AnthropicRequest {
            model: &model,
            messages,
            max_tokens: inv.params.max_tokens,
            temperature: inv.params.temperature,
            system,
        };

        let request = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body);

        let response = self.client.execute(request, inv.timeout, &self.name).await?;

        let response_body: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("{} returned unparsable JSON: {e}", self.name))
        })?;

        let content = response_body
            .content
            .into_iter()
            .find(|block| block.content_type == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| {
                LlmError::MalformedResponse(format!(
                    "{} response has no text content block",
                    self.name
                ))
            })?;

        let usage = integer_counters(response_body.usage);

        debug!(
            backend = %self.name,
            content_chars = content.len(),
            usage = ?usage,
            "Anthropic messages invocation completed"
        );

        Ok(ModelResponse {
            content,
            model,
            usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

//! Chat-completions HTTP backend
//!
//! Speaks the OpenAI-compatible `POST {endpoint}/chat/completions` shape used
//! by most hosted providers: bearer auth, a role-tagged message list, and the
//! generated text at `choices[0].message.content`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, Message, ModelResponse, Role, integer_counters};

/// Backend for OpenAI-compatible chat-completions endpoints
#[derive(Clone)]
pub(crate) struct ChatCompletionsBackend {
    client: Arc<HttpClient>,
    name: String,
    url: String,
    api_key: String,
    default_model: String,
}

impl ChatCompletionsBackend {
    /// Create a backend for `{endpoint}/chat/completions`.
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
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
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

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for ChatCompletionsBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<ModelResponse, LlmError> {
        let model = self.resolve_model(&inv);

        debug!(
            backend = %self.name,
            model = %model,
            max_tokens = inv.params.max_tokens,
            temperature = inv.params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking chat-completions backend"
        );

        let request_body = ChatRequest {
            model: &model,
            messages: Self::convert_messages(&inv.messages),
            temperature: inv.params.temperature,
            max_tokens: inv.params.max_tokens,
        };

        let request = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body);

        let response = self.client.execute(request, inv.timeout, &self.name).await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("{} returned unparsable JSON: {e}", self.name))
        })?;

        let content = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::MalformedResponse(format!(
                    "{} response missing choices[0].message.content",
                    self.name
                ))
            })?;

        let usage = integer_counters(response_body.usage);

        debug!(
            backend = %self.name,
            content_chars = content.len(),
            usage = ?usage,
            "Chat-completions invocation completed"
        );

        Ok(ModelResponse {
            content,
            model,
            usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationParams;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> ChatCompletionsBackend {
        ChatCompletionsBackend::new(
            Arc::new(HttpClient::new().unwrap()),
            "deepseek",
            &server.uri(),
            "test-key".to_string(),
            "deepseek-chat",
        )
    }

    fn prompt_invocation(system: Option<&str>) -> LlmInvocation {
        LlmInvocation::from_prompt(
            "Why does the callback never fire?",
            system,
            GenerationParams::default(),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_chat_request_shape_and_response_parsing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "deepseek-chat",
                "temperature": 0.7,
                "max_tokens": 4000,
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "Why does the callback never fire?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Confidence: 8"}}],
                "usage": {"prompt_tokens": 11, "completion_tokens": 4, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = backend(&server)
            .invoke(prompt_invocation(Some("be terse")))
            .await
            .unwrap();

        assert_eq!(response.content, "Confidence: 8");
        assert_eq!(response.model, "deepseek-chat");
        assert_eq!(response.usage["prompt_tokens"], 11);
        assert_eq!(response.usage["total_tokens"], 15);
    }

    #[tokio::test]
    async fn test_trailing_slash_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let backend = ChatCompletionsBackend::new(
            Arc::new(HttpClient::new().unwrap()),
            "arcee",
            &format!("{}/v1/", server.uri()),
            "k".to_string(),
            "m",
        );
        let response = backend.invoke(prompt_invocation(None)).await.unwrap();
        assert_eq!(response.content, "ok");
        assert!(response.usage.is_empty());
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = backend(&server)
            .invoke(prompt_invocation(None))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .invoke(prompt_invocation(None))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_status_codes_map_to_error_variants() {
        for (status, expected_kind) in [
            (401_u16, "provider_auth"),
            (403, "provider_auth"),
            (429, "provider_quota"),
            (503, "provider_outage"),
            (400, "transport"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = backend(&server)
                .invoke(prompt_invocation(None))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), expected_kind, "status {status} mapped to {err:?}");
        }
    }
}

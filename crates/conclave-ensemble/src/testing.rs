//! Scripted in-process backends for dispatcher and pipeline tests

use async_trait::async_trait;
use conclave_llm::{LlmBackend, LlmError, LlmInvocation, ModelResponse, Role};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Backend that replays a fixed script of replies, one per call.
///
/// Once the script runs out every further call fails with a transport
/// error. Every user prompt it receives is recorded.
pub struct ScriptedBackend {
    model: String,
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    system_prompts: Mutex<Vec<Option<String>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
            system_prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()))
    }

    #[must_use]
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    /// Sleep this long before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push(self, entry: Result<String, LlmError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn system_prompts(&self) -> Vec<Option<String>> {
        self.system_prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<ModelResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let user = inv
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        let system = inv
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(user);
        }
        if let Ok(mut systems) = self.system_prompts.lock() {
            systems.push(system);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        match next {
            Some(Ok(content)) => Ok(ModelResponse::new(content, self.model.clone())),
            Some(Err(error)) => Err(error),
            None => Err(LlmError::Transport("script exhausted".to_string())),
        }
    }
}

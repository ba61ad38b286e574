//! Ensemble dispatcher
//!
//! Holds the resolved backend set and fans prompts out to it. Per-backend
//! failures are recovered here and never reach the caller of `dispatch_all`.

use conclave_config::Config;
use conclave_error_redaction::redact_error_message_for_logging;
use conclave_llm::{
    BackendDescriptor, BackendRegistry, CredentialSource, GenerationParams, HttpClient,
    LlmBackend, LlmError, ModelResponse, construct_backend,
};
use conclave_utils::error::DispatchError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::EnsembleResponses;

/// Request parameters shared by every call the ensemble makes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSettings {
    pub params: GenerationParams,
    /// Upper bound on a single backend call
    pub call_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            params: GenerationParams::default(),
            call_timeout: Duration::from_secs(conclave_config::DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl DispatchSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            params: GenerationParams {
                temperature: config.temperature(),
                max_tokens: config.max_tokens(),
            },
            call_timeout: config.call_timeout(),
        }
    }
}

/// One registered backend and, if its credential resolved, its connector
struct Member {
    descriptor: BackendDescriptor,
    backend: Option<Arc<dyn LlmBackend>>,
}

/// The set of registered backends, resolved once at construction.
///
/// Backends whose credential is absent stay registered (so they can be
/// listed and named in errors) but are never dispatched to.
pub struct Ensemble {
    members: Vec<Member>,
    settings: DispatchSettings,
}

impl Ensemble {
    /// Resolve every descriptor in `registry` against `credentials`.
    ///
    /// No network I/O happens here.
    pub fn new(
        registry: &BackendRegistry,
        credentials: &dyn CredentialSource,
        client: &Arc<HttpClient>,
        settings: DispatchSettings,
    ) -> Self {
        let members = registry
            .iter()
            .map(|descriptor| {
                let backend = if credentials.is_available(descriptor) {
                    match construct_backend(descriptor, credentials, client) {
                        Ok(backend) => Some(backend),
                        Err(e) => {
                            warn!(
                                backend = %descriptor.name,
                                error = %redact_error_message_for_logging(&e.to_string()),
                                "Backend could not be constructed"
                            );
                            None
                        }
                    }
                } else {
                    debug!(
                        backend = %descriptor.name,
                        credential_env = %descriptor.credential_env,
                        "Backend excluded: credential not set"
                    );
                    None
                };
                Member {
                    descriptor: descriptor.clone(),
                    backend,
                }
            })
            .collect();

        Self { members, settings }
    }

    /// Build the ensemble declared by a validated config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &Config,
        credentials: &dyn CredentialSource,
    ) -> Result<Self, LlmError> {
        let client = Arc::new(HttpClient::new()?);
        Ok(Self::new(
            &BackendRegistry::from_config(config),
            credentials,
            &client,
            DispatchSettings::from_config(config),
        ))
    }

    /// Assemble an ensemble from already-constructed connectors.
    ///
    /// A `None` connector marks a registered backend without credentials.
    pub fn with_backends(
        backends: impl IntoIterator<Item = (BackendDescriptor, Option<Arc<dyn LlmBackend>>)>,
        settings: DispatchSettings,
    ) -> Self {
        let members = backends
            .into_iter()
            .map(|(descriptor, backend)| Member {
                descriptor,
                backend,
            })
            .collect();
        Self { members, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Every registered backend with its availability, in registry order.
    pub fn members(&self) -> impl Iterator<Item = (&BackendDescriptor, bool)> {
        self.members
            .iter()
            .map(|m| (&m.descriptor, m.backend.is_some()))
    }

    /// Names of the backends that will be dispatched to.
    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|m| m.backend.is_some())
            .map(|m| m.descriptor.name.as_str())
    }

    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available().count()
    }

    /// Send `prompt` to every available backend concurrently.
    ///
    /// Each call is bounded by the per-call timeout. A failing call is
    /// logged and left out of the result; it never cancels its siblings.
    /// When `deadline` passes, calls still in flight are aborted and the
    /// responses gathered so far are returned. An empty result is not an
    /// error.
    pub async fn dispatch_all(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        deadline: Option<Instant>,
    ) -> EnsembleResponses {
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            warn!("Run deadline already passed; dispatching to no backends");
            return EnsembleResponses::new();
        }

        let mut tasks = JoinSet::new();
        for (index, member) in self.members.iter().enumerate() {
            let Some(backend) = member.backend.clone() else {
                continue;
            };
            let name = member.descriptor.name.clone();
            let prompt = prompt.to_string();
            let system = system_prompt.map(str::to_string);
            let settings = self.settings;

            debug!(backend = %name, prompt_chars = prompt.len(), "Dispatching to backend");
            tasks.spawn(async move {
                let result = call_with_timeout(
                    backend.as_ref(),
                    &prompt,
                    system.as_deref(),
                    settings.params,
                    settings.call_timeout,
                )
                .await;
                (index, name, result)
            });
        }

        let dispatched = tasks.len();
        let mut settled = Vec::with_capacity(dispatched);

        loop {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await
                {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            abandoned = tasks.len(),
                            "Run deadline reached; aborting in-flight backend calls"
                        );
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((index, name, Ok(response))) => {
                    debug!(
                        backend = %name,
                        model = %response.model,
                        content_chars = response.content.len(),
                        "Backend responded"
                    );
                    settled.push((index, name, response));
                }
                Ok((_, name, Err(e))) => {
                    warn!(
                        backend = %name,
                        error_kind = e.kind(),
                        error = %redact_error_message_for_logging(&e.to_string()),
                        "Backend call failed; excluding from results"
                    );
                }
                Err(join_error) => {
                    warn!(error = %join_error, "Backend task did not complete");
                }
            }
        }

        settled.sort_by_key(|(index, _, _)| *index);

        info!(
            dispatched,
            responded = settled.len(),
            "Ensemble fan-out settled"
        );

        settled
            .into_iter()
            .map(|(_, name, response)| (name, response))
            .collect()
    }

    /// Call one named backend directly.
    ///
    /// # Errors
    ///
    /// - `UnknownBackend` if `name` is not registered
    /// - `BackendUnavailable` if its credential is absent
    /// - `Backend` if the call fails, times out, or the deadline has passed
    pub async fn dispatch_one(
        &self,
        name: &str,
        prompt: &str,
        system_prompt: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<ModelResponse, DispatchError> {
        let member = self
            .members
            .iter()
            .find(|m| m.descriptor.name == name)
            .ok_or_else(|| DispatchError::UnknownBackend {
                name: name.to_string(),
            })?;

        let backend = member
            .backend
            .as_ref()
            .ok_or_else(|| DispatchError::BackendUnavailable {
                name: name.to_string(),
                credential_env: member.descriptor.credential_env.clone(),
            })?;

        let timeout = match deadline {
            Some(deadline) => self
                .settings
                .call_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.settings.call_timeout,
        };
        if timeout.is_zero() {
            return Err(DispatchError::Backend {
                name: name.to_string(),
                source: LlmError::Timeout { duration: timeout },
            });
        }

        debug!(backend = %name, prompt_chars = prompt.len(), "Dispatching to single backend");
        call_with_timeout(
            backend.as_ref(),
            prompt,
            system_prompt,
            self.settings.params,
            timeout,
        )
        .await
        .map_err(|source| DispatchError::Backend {
            name: name.to_string(),
            source,
        })
    }
}

async fn call_with_timeout(
    backend: &dyn LlmBackend,
    prompt: &str,
    system_prompt: Option<&str>,
    params: GenerationParams,
    timeout: Duration,
) -> Result<ModelResponse, LlmError> {
    match tokio::time::timeout(
        timeout,
        backend.generate(prompt, system_prompt, params, timeout),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout { duration: timeout }),
    }
}

//! Backend connectors for conclave
//!
//! Every backend implements [`LlmBackend`]: one uniform request (prompt,
//! optional system prompt, temperature, output cap) mapped onto a
//! provider-specific wire shape. Two wire formats are supported,
//! OpenAI-compatible chat-completions and Anthropic messages. A backend may
//! carry one fallback route that is tried once when the primary call fails.
//!
//! Credential resolution ([`CredentialSource`]) is local and never touches
//! the network; the [`BackendRegistry`] is built once and read-only after.

mod anthropic_backend;
mod chat_backend;
mod credentials;
mod fallback_backend;
pub mod http_client;
mod registry;
mod types;

pub use conclave_utils::error::LlmError;
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use fallback_backend::FallbackBackend;
pub use http_client::HttpClient;
pub use registry::{BackendDescriptor, BackendRegistry, FallbackRoute};
pub use types::{GenerationParams, LlmBackend, LlmInvocation, Message, ModelResponse, Role};

pub use conclave_config::WireFormat;

use std::sync::Arc;
use tracing::debug;

use anthropic_backend::AnthropicBackend;
use chat_backend::ChatCompletionsBackend;

fn construct_route(
    client: &Arc<HttpClient>,
    name: &str,
    wire: WireFormat,
    endpoint: &str,
    api_key: String,
    model: &str,
) -> Arc<dyn LlmBackend> {
    match wire {
        WireFormat::ChatCompletions => Arc::new(ChatCompletionsBackend::new(
            Arc::clone(client),
            name,
            endpoint,
            api_key,
            model,
        )),
        WireFormat::AnthropicMessages => Arc::new(AnthropicBackend::new(
            Arc::clone(client),
            name,
            endpoint,
            api_key,
            model,
        )),
    }
}

/// Construct the backend described by `descriptor`.
///
/// The fallback route is attached only when its own credential is present;
/// otherwise a primary failure is returned as-is.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` if the primary credential is absent.
pub fn construct_backend(
    descriptor: &BackendDescriptor,
    credentials: &dyn CredentialSource,
    client: &Arc<HttpClient>,
) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let api_key = credentials
        .lookup(&descriptor.credential_env)
        .ok_or_else(|| {
            LlmError::Misconfiguration(format!(
                "Backend '{}' has no credential: {} is not set",
                descriptor.name, descriptor.credential_env
            ))
        })?;

    let primary = construct_route(
        client,
        &descriptor.name,
        descriptor.wire,
        &descriptor.endpoint,
        api_key,
        &descriptor.model,
    );

    let Some(route) = &descriptor.fallback else {
        return Ok(primary);
    };

    match credentials.lookup(&route.credential_env) {
        Some(fallback_key) => {
            let fallback = construct_route(
                client,
                &descriptor.name,
                route.wire,
                &route.endpoint,
                fallback_key,
                &route.model,
            );
            Ok(Arc::new(FallbackBackend::new(
                descriptor.name.clone(),
                primary,
                fallback,
            )))
        }
        None => {
            debug!(
                backend = %descriptor.name,
                fallback_credential = %route.credential_env,
                "Fallback route disabled: credential not set"
            );
            Ok(primary)
        }
    }
}

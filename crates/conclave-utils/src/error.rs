use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `ConclaveError` is the umbrella error returned by conclave library and CLI
/// operations. Backend-level failures never surface here during a fan-out:
/// the ensemble dispatcher isolates them. Only configuration problems, the
/// fatal pipeline conditions and transcript I/O reach the caller.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 3 | No solution candidates were produced |
/// | 4 | The synthesis backend could not answer |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum ConclaveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcript write failed at {path}: {reason}")]
    TranscriptWriteFailed { path: String, reason: String },
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    BackendIntegration,
    PipelineExecution,
    FileSystem,
    ResourceLimits,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::BackendIntegration => write!(f, "Backend Integration"),
            Self::PipelineExecution => write!(f, "Pipeline Execution"),
            Self::FileSystem => write!(f, "File System"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(msg) => format!("The configuration file could not be parsed: {msg}"),
            Self::InvalidValue { key, value } => {
                format!("Configuration key '{key}' has an invalid value: {value}")
            }
            Self::NotFound { path } => format!("No configuration file exists at {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Configuration discovery failed: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Configuration is loaded from .conclave/config.toml, CLI flags and built-in defaults."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .conclave/config.toml".to_string(),
                "Remove unknown sections or keys".to_string(),
            ],
            Self::InvalidValue { key, .. } => vec![
                format!("Fix the value of '{key}' in the config file or CLI flags"),
                "Run 'conclave backends --verbose' to see effective values and their sources"
                    .to_string(),
            ],
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to use upward discovery".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check permissions on the current directory and CONCLAVE_HOME".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors produced by a single backend call.
///
/// Inside a fan-out every variant is treated the same way: the failing backend
/// is logged and left out of that phase's responses.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Connection-level failure (DNS, TLS, connection reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Call exceeded its per-call deadline
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Response body unparsable or missing the expected content field
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Provider authentication failure (401, 403)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Backend could not be constructed from its descriptor
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Primary route and its fallback route both failed
    #[error("Primary route failed ({primary}); fallback route failed ({fallback})")]
    FallbackExhausted { primary: String, fallback: String },
}

impl LlmError {
    /// Short machine-friendly label used in structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::ProviderAuth(_) => "provider_auth",
            Self::ProviderQuota(_) => "provider_quota",
            Self::ProviderOutage(_) => "provider_outage",
            Self::Misconfiguration(_) => "misconfiguration",
            Self::FallbackExhausted { .. } => "fallback_exhausted",
        }
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Backend could not be reached: {msg}"),
            Self::Timeout { duration } => format!("Backend call timed out after {duration:?}"),
            Self::MalformedResponse(msg) => format!("Backend returned an unusable response: {msg}"),
            Self::ProviderAuth(msg) => format!("Backend rejected the credential: {msg}"),
            Self::ProviderQuota(msg) => format!("Backend rate limit exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("Backend service outage: {msg}"),
            Self::Misconfiguration(msg) => format!("Backend configuration error: {msg}"),
            Self::FallbackExhausted { primary, fallback } => format!(
                "Backend failed on its primary route ({primary}) and on its fallback route ({fallback})"
            ),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => {
                Some("Network failures are isolated to the backend that produced them.".to_string())
            }
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => Some(
                "Credentials are read from the environment variable named by each backend."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) | Self::ProviderOutage(_) => vec![
                "Check network connectivity to the backend endpoint".to_string(),
                "Retry later or remove the backend from the registry".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase --call-timeout or [defaults] call_timeout_secs".to_string(),
            ],
            Self::MalformedResponse(_) => vec![
                "Verify the backend's wire format in [[backends]]".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the credential environment variable holds a valid key".to_string(),
            ],
            Self::ProviderQuota(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Check the provider's usage dashboard".to_string(),
            ],
            Self::Misconfiguration(_) => vec![
                "Review the backend definition in .conclave/config.toml".to_string(),
            ],
            Self::FallbackExhausted { .. } => vec![
                "Check credentials for both the primary and the fallback provider".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderQuota(_) | Self::Timeout { .. } => ErrorCategory::ResourceLimits,
            Self::Misconfiguration(_) | Self::ProviderAuth(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::BackendIntegration,
        }
    }
}

/// Errors raised by directed (single-backend) dispatch.
///
/// Fan-out dispatch never returns these; it drops failing backends instead.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Backend '{name}' is not registered")]
    UnknownBackend { name: String },

    #[error("Backend '{name}' is unavailable: credential {credential_env} is not set")]
    BackendUnavailable { name: String, credential_env: String },

    #[error("Backend '{name}' failed: {source}")]
    Backend {
        name: String,
        #[source]
        source: LlmError,
    },
}

impl UserFriendlyError for DispatchError {
    fn user_message(&self) -> String {
        match self {
            Self::UnknownBackend { name } => format!("No backend named '{name}' is registered"),
            Self::BackendUnavailable {
                name,
                credential_env,
            } => format!("Backend '{name}' cannot be used because {credential_env} is not set"),
            Self::Backend { name, source } => {
                format!("Backend '{name}' failed: {}", source.user_message())
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Backend { source, .. } => source.context(),
            _ => Some("The synthesis phase talks to exactly one designated backend.".to_string()),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownBackend { .. } => vec![
                "Run 'conclave backends' to list registered backends".to_string(),
                "Fix [pipeline] synthesis_backend or --synthesis-backend".to_string(),
            ],
            Self::BackendUnavailable { credential_env, .. } => vec![
                format!("Export {credential_env} before running"),
                "Choose a credentialed backend with --synthesis-backend".to_string(),
            ],
            Self::Backend { source, .. } => source.suggestions(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Backend { source, .. } => source.category(),
            _ => ErrorCategory::Configuration,
        }
    }
}

/// Conditions that stop a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Candidate generation produced nothing, so there is no seed to synthesize from.
    #[error("No solution candidates available: every backend failed during candidate generation")]
    NoCandidatesAvailable,

    /// The run finished but its directed synthesis call failed. The run
    /// record still carries every earlier phase.
    #[error("Synthesis failed: {reason}")]
    SynthesisIncomplete { reason: String },
}

impl UserFriendlyError for PipelineError {
    fn user_message(&self) -> String {
        match self {
            Self::NoCandidatesAvailable => {
                "No backend produced a solution candidate, so nothing could be synthesized"
                    .to_string()
            }
            Self::SynthesisIncomplete { reason } => format!("Final synthesis failed: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::NoCandidatesAvailable => Some(
                "Candidate generation fans out to every credentialed backend; all of them failed or none were credentialed."
                    .to_string(),
            ),
            Self::SynthesisIncomplete { .. } => Some(
                "Analysis, candidates and validations completed and were saved to the transcript."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NoCandidatesAvailable => vec![
                "Run 'conclave backends' to check which credentials are set".to_string(),
                "Re-run with --verbose to see per-backend failures".to_string(),
            ],
            Self::SynthesisIncomplete { .. } => vec![
                "Run 'conclave backends' to check the synthesis backend's credential".to_string(),
                "Choose another backend with --synthesis-backend".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::PipelineExecution
    }
}

impl UserFriendlyError for ConclaveError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
            Self::Dispatch(err) => err.user_message(),
            Self::Pipeline(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
            Self::TranscriptWriteFailed { path, reason } => {
                format!("Failed to save the run transcript to {path}: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Llm(err) => err.context(),
            Self::Dispatch(err) => err.context(),
            Self::Pipeline(err) => err.context(),
            Self::Io(_) | Self::TranscriptWriteFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Llm(err) => err.suggestions(),
            Self::Dispatch(err) => err.suggestions(),
            Self::Pipeline(err) => err.suggestions(),
            Self::Io(_) => vec!["Check file permissions and free disk space".to_string()],
            Self::TranscriptWriteFailed { .. } => vec![
                "Check that the output directory is writable".to_string(),
                "Use --out to choose another directory".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Llm(err) => err.category(),
            Self::Dispatch(err) => err.category(),
            Self::Pipeline(err) => err.category(),
            Self::Io(_) | Self::TranscriptWriteFailed { .. } => ErrorCategory::FileSystem,
        }
    }
}

impl ConclaveError {
    /// Render the error with context and suggestions for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("✗ {} error: {}", self.category(), self.user_message());
        if let Some(context) = self.context() {
            out.push_str("\n\n");
            out.push_str(&context);
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str("\n  • ");
                out.push_str(&suggestion);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_source_chain() {
        use std::error::Error as _;

        let err = DispatchError::Backend {
            name: "deepseek".to_string(),
            source: LlmError::Timeout {
                duration: Duration::from_secs(5),
            },
        };
        let source = err.source().expect("backend error should carry a source");
        assert!(source.to_string().contains("Timeout"));
        assert!(err.to_string().contains("deepseek"));
    }

    #[test]
    fn test_synthesis_incomplete_points_at_transcript() {
        let reason = DispatchError::BackendUnavailable {
            name: "deepseek".to_string(),
            credential_env: "DEEPSEEK_API_KEY".to_string(),
        }
        .user_message();
        let err = PipelineError::SynthesisIncomplete { reason };
        assert!(err.user_message().contains("DEEPSEEK_API_KEY"));
        assert!(err.context().unwrap().contains("transcript"));
    }

    #[test]
    fn test_display_for_user_includes_suggestions() {
        let err = ConclaveError::Pipeline(PipelineError::NoCandidatesAvailable);
        let rendered = err.display_for_user();
        assert!(rendered.contains("Pipeline Execution"));
        assert!(rendered.contains("Suggestions:"));
        assert!(rendered.contains("conclave backends"));
    }

    #[test]
    fn test_llm_error_kinds_are_stable() {
        assert_eq!(LlmError::Transport(String::new()).kind(), "transport");
        assert_eq!(
            LlmError::MalformedResponse(String::new()).kind(),
            "malformed_response"
        );
        assert_eq!(
            LlmError::Timeout {
                duration: Duration::from_secs(1)
            }
            .kind(),
            "timeout"
        );
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use conclave_utils::types::ConfigSource;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SYNTHESIS_BACKEND: &str = "deepseek";
pub const DEFAULT_OUTPUT_DIR: &str = "analysis_results";

/// Configuration for conclave runs.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > `CONCLAVE_HOME` > discovered config file > built-in defaults.
///
/// # Discovery
///
/// Use [`Config::discover()`] for CLI-like behavior that:
/// - Uses `$CONCLAVE_HOME/config.toml` when `CONCLAVE_HOME` is set
/// - Otherwise searches for `.conclave/config.toml` upward from the current directory
/// - Applies built-in defaults for unspecified values
///
/// # Example
///
/// ```rust,no_run
/// use conclave_config::{CliArgs, Config};
///
/// let config = Config::discover(&CliArgs::default())?;
/// println!("Synthesis backend: {}", config.synthesis_backend());
/// println!("Backends: {}", config.backends.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub pipeline: PipelineConfig,
    /// Ordered backend registry. Order drives every registry-order tie-break.
    pub backends: Vec<BackendConfig>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section: request parameters and deadlines
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub call_timeout_secs: Option<u64>,
    pub run_timeout_secs: Option<u64>,
    pub verbose: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            call_timeout_secs: Some(DEFAULT_CALL_TIMEOUT_SECS),
            run_timeout_secs: None,
            verbose: Some(false),
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Backend that receives the single synthesis call
    pub synthesis_backend: Option<String>,
    /// System prompt forwarded to every fan-out phase
    pub analysis_system_prompt: Option<String>,
    /// Where `conclave analyze` writes run transcripts
    pub output_dir: Option<PathBuf>,
}

/// Request/response shape spoken by a backend endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireFormat {
    /// `POST {endpoint}/chat/completions`, bearer auth, role-tagged message list
    #[default]
    ChatCompletions,
    /// `POST {endpoint}/messages`, `x-api-key` auth, separate top-level system field
    AnthropicMessages,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChatCompletions => write!(f, "chat-completions"),
            Self::AnthropicMessages => write!(f, "anthropic-messages"),
        }
    }
}

/// One `[[backends]]` entry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub name: String,
    /// Environment variable holding the API key
    pub credential_env: String,
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub wire: WireFormat,
    #[serde(default)]
    pub fallback: Option<FallbackConfig>,
}

/// Secondary route a backend retries through once when its primary call fails
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FallbackConfig {
    pub credential_env: String,
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub wire: WireFormat,
}

impl BackendConfig {
    fn chat(name: &str, credential_env: &str, endpoint: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            credential_env: credential_env.to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            wire: WireFormat::ChatCompletions,
            fallback: None,
        }
    }
}

/// Built-in registry used when the config file declares no `[[backends]]`.
#[must_use]
pub fn builtin_backends() -> Vec<BackendConfig> {
    let mut qwen = BackendConfig::chat(
        "qwen",
        "QWEN_API_KEY",
        "https://api.qwen.ai/v1",
        "qwen/qwen3-coder:free",
    );
    qwen.fallback = Some(FallbackConfig {
        credential_env: "OPENROUTER_API_KEY".to_string(),
        endpoint: "https://openrouter.ai/api/v1".to_string(),
        model: "qwen/qwen-2.5-coder-32b-instruct".to_string(),
        wire: WireFormat::ChatCompletions,
    });

    let mut anthropic = BackendConfig::chat(
        "anthropic",
        "ANTHROPIC_API_KEY",
        "https://api.anthropic.com/v1",
        "claude-opus-4.5-20251101",
    );
    anthropic.wire = WireFormat::AnthropicMessages;

    vec![
        BackendConfig::chat(
            "arcee",
            "ARCEE_API_KEY",
            "https://api.arcee.ai/v1",
            "arcee-ai/trinity-large-preview:free",
        ),
        BackendConfig::chat(
            "deepseek",
            "DEEPSEEK_API_KEY",
            "https://api.deepseek.com/v1",
            "deepseek/deepseek-r1-0528:free",
        ),
        qwen,
        anthropic,
    ]
}

//! Configuration management for conclave
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > `CONCLAVE_HOME` > discovered file > defaults. Supports TOML
//! configuration files with `[defaults]`, `[pipeline]` and `[[backends]]`
//! sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use conclave_utils::types::ConfigSource;

use std::path::PathBuf;
use std::time::Duration;

impl Config {
    /// Sampling temperature sent with every request.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.defaults.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Output-size cap sent with every request.
    #[must_use]
    pub fn max_tokens(&self) -> u32 {
        self.defaults.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Per-call deadline applied by the ensemble dispatcher.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .call_timeout_secs
                .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
        )
    }

    /// Pipeline-wide deadline, if one is configured.
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.defaults.run_timeout_secs.map(Duration::from_secs)
    }

    /// Name of the backend used for the directed synthesis call.
    #[must_use]
    pub fn synthesis_backend(&self) -> &str {
        self.pipeline
            .synthesis_backend
            .as_deref()
            .unwrap_or(DEFAULT_SYNTHESIS_BACKEND)
    }

    /// Directory where run transcripts are written.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.pipeline
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Create a minimal Config for testing purposes.
    ///
    /// Uses the built-in backend registry and default values, with no file or
    /// environment lookups.
    pub fn minimal_for_testing() -> Self {
        Config {
            defaults: Defaults::default(),
            pipeline: PipelineConfig::default(),
            backends: builtin_backends(),
            source_attribution: std::collections::HashMap::new(),
        }
    }
}

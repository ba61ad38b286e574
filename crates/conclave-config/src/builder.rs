use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use conclave_utils::error::ConfigError;

use super::{BackendConfig, Config, ConfigSource, Defaults, PipelineConfig};
use crate::model::builtin_backends;

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding conclave and deterministic behavior independent
    /// of config files and environment variables is required.
    ///
    /// ```rust
    /// use conclave_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .temperature(0.3)
    ///     .call_timeout(Duration::from_secs(30))
    ///     .synthesis_backend("qwen")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.synthesis_backend(), "qwen");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration of conclave.
///
/// All values set via the builder are attributed to `ConfigSource::Programmatic`.
/// Backends default to the built-in registry unless [`ConfigBuilder::backend`]
/// or [`ConfigBuilder::backends`] is used.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    call_timeout: Option<Duration>,
    run_timeout: Option<Duration>,
    verbose: Option<bool>,
    synthesis_backend: Option<String>,
    analysis_system_prompt: Option<String>,
    output_dir: Option<PathBuf>,
    backends: Option<Vec<BackendConfig>>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Per-call deadline. Sub-second precision is truncated.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Pipeline-wide deadline. Sub-second precision is truncated.
    #[must_use]
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    #[must_use]
    pub fn synthesis_backend(mut self, name: impl Into<String>) -> Self {
        self.synthesis_backend = Some(name.into());
        self
    }

    #[must_use]
    pub fn analysis_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.analysis_system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Replace the backend registry.
    #[must_use]
    pub fn backends(mut self, backends: Vec<BackendConfig>) -> Self {
        self.backends = Some(backends);
        self
    }

    /// Append one backend. The first call discards the built-in registry.
    #[must_use]
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.backends.get_or_insert_with(Vec::new).push(backend);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a value fails validation.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut defaults = Defaults::default();
        let mut pipeline = PipelineConfig::default();

        let mut mark = |key: &str, set: bool| {
            let source = if set {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        mark("temperature", self.temperature.is_some());
        if self.temperature.is_some() {
            defaults.temperature = self.temperature;
        }
        mark("max_tokens", self.max_tokens.is_some());
        if self.max_tokens.is_some() {
            defaults.max_tokens = self.max_tokens;
        }
        mark("call_timeout_secs", self.call_timeout.is_some());
        if let Some(timeout) = self.call_timeout {
            defaults.call_timeout_secs = Some(timeout.as_secs());
        }
        if let Some(timeout) = self.run_timeout {
            mark("run_timeout_secs", true);
            defaults.run_timeout_secs = Some(timeout.as_secs());
        }
        mark("verbose", self.verbose.is_some());
        if self.verbose.is_some() {
            defaults.verbose = self.verbose;
        }
        mark("synthesis_backend", self.synthesis_backend.is_some());
        pipeline.synthesis_backend = self.synthesis_backend;
        if self.analysis_system_prompt.is_some() {
            mark("analysis_system_prompt", true);
        }
        pipeline.analysis_system_prompt = self.analysis_system_prompt;
        mark("output_dir", self.output_dir.is_some());
        pipeline.output_dir = self.output_dir;
        mark("backends", self.backends.is_some());
        let backends = self.backends.unwrap_or_else(builtin_backends);

        let config = Config {
            defaults,
            pipeline,
            backends,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }
}

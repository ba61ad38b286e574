use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use conclave_utils::error::ConfigError;

use super::{BackendConfig, CliArgs, Config, ConfigSource, Defaults, PipelineConfig};
use crate::model::builtin_backends;

/// Environment variable naming a directory that holds `config.toml`
pub const CONCLAVE_HOME_ENV: &str = "CONCLAVE_HOME";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    pipeline: Option<PipelineConfig>,
    #[serde(default)]
    backends: Vec<BackendConfig>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > `CONCLAVE_HOME` > file > defaults
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the current directory cannot be read, a
    /// config file cannot be parsed, or the effective configuration is invalid.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to get current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// # Errors
    ///
    /// Same as [`Config::discover`].
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut pipeline = PipelineConfig::default();
        let mut backends = builtin_backends();

        for key in [
            "temperature",
            "max_tokens",
            "call_timeout_secs",
            "verbose",
            "synthesis_backend",
            "output_dir",
            "backends",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit_path) => {
                if !explicit_path.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit_path.display().to_string(),
                    });
                }
                Some(explicit_path.clone())
            }
            None => Self::home_config_file().or_else(|| Self::discover_config_file_from(start_dir)),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)?;
            let config_source = ConfigSource::Config;

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.temperature.is_some() {
                    defaults.temperature = file_defaults.temperature;
                    source_attribution.insert("temperature".to_string(), config_source);
                }
                if file_defaults.max_tokens.is_some() {
                    defaults.max_tokens = file_defaults.max_tokens;
                    source_attribution.insert("max_tokens".to_string(), config_source);
                }
                if file_defaults.call_timeout_secs.is_some() {
                    defaults.call_timeout_secs = file_defaults.call_timeout_secs;
                    source_attribution.insert("call_timeout_secs".to_string(), config_source);
                }
                if file_defaults.run_timeout_secs.is_some() {
                    defaults.run_timeout_secs = file_defaults.run_timeout_secs;
                    source_attribution.insert("run_timeout_secs".to_string(), config_source);
                }
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), config_source);
                }
            }

            if let Some(file_pipeline) = file_config.pipeline {
                if file_pipeline.synthesis_backend.is_some() {
                    pipeline.synthesis_backend = file_pipeline.synthesis_backend;
                    source_attribution.insert("synthesis_backend".to_string(), config_source);
                }
                if file_pipeline.analysis_system_prompt.is_some() {
                    pipeline.analysis_system_prompt = file_pipeline.analysis_system_prompt;
                    source_attribution
                        .insert("analysis_system_prompt".to_string(), config_source);
                }
                if file_pipeline.output_dir.is_some() {
                    pipeline.output_dir = file_pipeline.output_dir;
                    source_attribution.insert("output_dir".to_string(), config_source);
                }
            }

            // A file that declares backends replaces the built-in registry wholesale.
            if !file_config.backends.is_empty() {
                backends = file_config.backends;
                source_attribution.insert("backends".to_string(), config_source);
            }
        }

        // Apply CLI overrides (highest priority)
        if let Some(temperature) = cli_args.temperature {
            defaults.temperature = Some(temperature);
            source_attribution.insert("temperature".to_string(), ConfigSource::Cli);
        }
        if let Some(max_tokens) = cli_args.max_tokens {
            defaults.max_tokens = Some(max_tokens);
            source_attribution.insert("max_tokens".to_string(), ConfigSource::Cli);
        }
        if let Some(call_timeout) = cli_args.call_timeout_secs {
            defaults.call_timeout_secs = Some(call_timeout);
            source_attribution.insert("call_timeout_secs".to_string(), ConfigSource::Cli);
        }
        if let Some(run_timeout) = cli_args.run_timeout_secs {
            defaults.run_timeout_secs = Some(run_timeout);
            source_attribution.insert("run_timeout_secs".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }
        if let Some(backend) = &cli_args.synthesis_backend {
            pipeline.synthesis_backend = Some(backend.clone());
            source_attribution.insert("synthesis_backend".to_string(), ConfigSource::Cli);
        }
        if let Some(output_dir) = &cli_args.output_dir {
            pipeline.output_dir = Some(output_dir.clone());
            source_attribution.insert("output_dir".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            defaults,
            pipeline,
            backends,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    fn home_config_file() -> Option<PathBuf> {
        let home = env::var_os(CONCLAVE_HOME_ENV).filter(|v| !v.is_empty())?;
        let path = PathBuf::from(home).join("config.toml");
        path.is_file().then_some(path)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.conclave/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir;

        loop {
            let config_path = current_dir.join(".conclave").join("config.toml");
            if config_path.is_file() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            current_dir = current_dir.parent()?;
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::InvalidFile(format!("Failed to read {}: {e}", path.display()))
            }
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!(
                "Failed to parse TOML config file {}: {e}",
                path.display()
            ))
        })
    }
}

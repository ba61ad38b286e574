//! Shared value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source of a configuration value.
///
/// Precedence: CLI arguments > config file > programmatic overrides > built-in defaults.
///
/// ```rust
/// use conclave_utils::types::ConfigSource;
///
/// let json = serde_json::to_string(&ConfigSource::Cli).unwrap();
/// assert_eq!(json, r#""cli""#);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Cli => write!(f, "cli"),
            ConfigSource::Config => write!(f, "config"),
            ConfigSource::Programmatic => write!(f, "programmatic"),
            ConfigSource::Default => write!(f, "default"),
        }
    }
}

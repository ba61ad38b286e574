use std::collections::HashSet;

use conclave_utils::error::ConfigError;

use super::Config;

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(temperature) = self.defaults.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(invalid(
                "temperature",
                format!("{temperature} is outside the range 0.0..=2.0"),
            ));
        }

        if let Some(max_tokens) = self.defaults.max_tokens {
            if max_tokens == 0 {
                return Err(invalid("max_tokens", "must be greater than 0"));
            }
            if max_tokens > 200_000 {
                return Err(invalid("max_tokens", "exceeds maximum limit of 200000"));
            }
        }

        if let Some(call_timeout) = self.defaults.call_timeout_secs {
            if call_timeout < 5 {
                return Err(invalid("call_timeout_secs", "must be at least 5 seconds"));
            }
            if call_timeout > 3600 {
                return Err(invalid(
                    "call_timeout_secs",
                    "exceeds maximum limit of 3600 seconds (1 hour)",
                ));
            }
        }

        if let Some(run_timeout) = self.defaults.run_timeout_secs
            && run_timeout < self.call_timeout().as_secs()
        {
            return Err(invalid(
                "run_timeout_secs",
                format!(
                    "{run_timeout} is shorter than call_timeout_secs ({})",
                    self.call_timeout().as_secs()
                ),
            ));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                return Err(invalid("backends.name", "backend names must not be empty"));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(invalid(
                    "backends.name",
                    format!("duplicate backend name '{}'", backend.name),
                ));
            }
            if backend.credential_env.trim().is_empty() {
                return Err(invalid(
                    format!("backends.{}.credential_env", backend.name),
                    "must not be empty",
                ));
            }
            if !backend.endpoint.starts_with("http://") && !backend.endpoint.starts_with("https://")
            {
                return Err(invalid(
                    format!("backends.{}.endpoint", backend.name),
                    format!("'{}' is not an http(s) URL", backend.endpoint),
                ));
            }
            if let Some(fallback) = &backend.fallback
                && !fallback.endpoint.starts_with("http://")
                && !fallback.endpoint.starts_with("https://")
            {
                return Err(invalid(
                    format!("backends.{}.fallback.endpoint", backend.name),
                    format!("'{}' is not an http(s) URL", fallback.endpoint),
                ));
            }
        }

        let synthesis = self.synthesis_backend();
        if !seen.contains(synthesis) {
            return Err(invalid(
                "synthesis_backend",
                format!("'{synthesis}' is not a registered backend"),
            ));
        }

        Ok(())
    }
}

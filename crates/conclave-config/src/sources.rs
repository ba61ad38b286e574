use super::{Config, ConfigSource};

impl Config {
    /// Effective configuration as `(key, value, source)` rows in a stable order.
    ///
    /// Keys without an explicit attribution are reported as `default`.
    #[must_use]
    pub fn effective_config(&self) -> Vec<(String, String, ConfigSource)> {
        let source = |key: &str| {
            self.source_attribution
                .get(key)
                .copied()
                .unwrap_or(ConfigSource::Default)
        };

        let mut rows = vec![
            ("temperature", self.temperature().to_string()),
            ("max_tokens", self.max_tokens().to_string()),
            (
                "call_timeout_secs",
                self.call_timeout().as_secs().to_string(),
            ),
        ];
        if let Some(run_timeout) = self.run_timeout() {
            rows.push(("run_timeout_secs", run_timeout.as_secs().to_string()));
        }
        rows.push(("synthesis_backend", self.synthesis_backend().to_string()));
        rows.push(("output_dir", self.output_dir().display().to_string()));
        if self.pipeline.analysis_system_prompt.is_some() {
            rows.push(("analysis_system_prompt", "<set>".to_string()));
        }
        rows.push(("backends", self.backends.len().to_string()));

        rows.into_iter()
            .map(|(key, value)| (key.to_string(), value, source(key)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_defaults_attributed() {
        let config = Config::minimal_for_testing();
        let rows = config.effective_config();

        let synthesis = rows
            .iter()
            .find(|(key, _, _)| key == "synthesis_backend")
            .unwrap();
        assert_eq!(synthesis.1, "deepseek");
        assert_eq!(synthesis.2, ConfigSource::Default);
        assert!(!rows.iter().any(|(key, _, _)| key == "run_timeout_secs"));
    }
}

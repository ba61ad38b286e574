//! Backend registry
//!
//! An ordered, immutable list of backend descriptors built once at process
//! start. Order matters: it is the iteration order for fan-out results and
//! for every registry-order tie-break downstream.

use conclave_config::{BackendConfig, Config, FallbackConfig, WireFormat, builtin_backends};

/// Immutable description of one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// Unique registry key
    pub name: String,
    /// Credential lookup key (an environment variable name for `EnvCredentials`)
    pub credential_env: String,
    pub endpoint: String,
    pub model: String,
    pub wire: WireFormat,
    pub fallback: Option<FallbackRoute>,
}

/// Secondary provider a backend retries through once on failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRoute {
    pub credential_env: String,
    pub endpoint: String,
    pub model: String,
    pub wire: WireFormat,
}

impl BackendDescriptor {
    /// Chat-completions descriptor without a fallback route.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        credential_env: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            credential_env: credential_env.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            wire: WireFormat::ChatCompletions,
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_wire(mut self, wire: WireFormat) -> Self {
        self.wire = wire;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackRoute) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl From<&FallbackConfig> for FallbackRoute {
    fn from(config: &FallbackConfig) -> Self {
        Self {
            credential_env: config.credential_env.clone(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            wire: config.wire,
        }
    }
}

impl From<&BackendConfig> for BackendDescriptor {
    fn from(config: &BackendConfig) -> Self {
        Self {
            name: config.name.clone(),
            credential_env: config.credential_env.clone(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            wire: config.wire,
            fallback: config.fallback.as_ref().map(FallbackRoute::from),
        }
    }
}

/// Ordered collection of backend descriptors keyed by unique name
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    descriptors: Vec<BackendDescriptor>,
}

impl BackendRegistry {
    /// Build a registry from descriptors. A later descriptor with a name that
    /// is already present replaces the earlier one in place.
    #[must_use]
    pub fn new(descriptors: impl IntoIterator<Item = BackendDescriptor>) -> Self {
        let mut registry = Self::default();
        for descriptor in descriptors {
            registry.insert(descriptor);
        }
        registry
    }

    /// The built-in four-backend registry.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_backends().iter().map(BackendDescriptor::from))
    }

    /// The registry declared by (or defaulted into) a validated config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.backends.iter().map(BackendDescriptor::from))
    }

    fn insert(&mut self, descriptor: BackendDescriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|existing| existing.name == descriptor.name)
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BackendDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.descriptors.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.len(), 4);

        let qwen = registry.get("qwen").unwrap();
        let fallback = qwen.fallback.as_ref().unwrap();
        assert_eq!(fallback.endpoint, "https://openrouter.ai/api/v1");
        assert_eq!(fallback.model, "qwen/qwen-2.5-coder-32b-instruct");

        assert_eq!(
            registry.get("anthropic").unwrap().wire,
            WireFormat::AnthropicMessages
        );
        assert!(registry.get("gpt").is_none());
    }

    #[test]
    fn test_duplicate_name_replaces_in_place() {
        let registry = BackendRegistry::new([
            BackendDescriptor::new("a", "A_KEY", "http://a", "m1"),
            BackendDescriptor::new("b", "B_KEY", "http://b", "m2"),
            BackendDescriptor::new("a", "A_KEY", "http://a2", "m3"),
        ]);

        let names: Vec<&str> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().model, "m3");
    }

    #[test]
    fn test_from_config_preserves_order() {
        let config = Config::minimal_for_testing();
        let registry = BackendRegistry::from_config(&config);
        let names: Vec<&str> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["arcee", "deepseek", "qwen", "anthropic"]);
    }
}

//! Credential resolution
//!
//! Decides whether a backend is usable without touching the network. A
//! backend whose key is absent is left out of dispatch entirely.

use std::collections::HashMap;

use crate::registry::BackendDescriptor;

/// Local lookup of API keys by credential key.
pub trait CredentialSource: Send + Sync {
    /// Return the credential stored under `key`, if any.
    ///
    /// Empty or whitespace-only values count as absent.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Whether `descriptor`'s primary credential is present.
    ///
    /// A fallback credential never makes a backend available on its own.
    fn is_available(&self, descriptor: &BackendDescriptor) -> bool {
        self.lookup(&descriptor.credential_env).is_some()
    }
}

/// Reads credentials from process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.trim().is_empty())
    }
}

/// Fixed in-memory credentials, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }
}

//! Backends command implementation
//!
//! Handles `conclave backends`. Availability is decided from local
//! credentials only; no request is ever sent.

use anyhow::Result;

use crate::Config;
use crate::llm::{BackendRegistry, CredentialSource, EnvCredentials};

/// Execute the backends command
pub fn execute_backends_command(verbose: bool, config: &Config) -> Result<()> {
    print!("{}", render_backends(config, &EnvCredentials, verbose));
    Ok(())
}

fn render_backends(config: &Config, credentials: &dyn CredentialSource, verbose: bool) -> String {
    let registry = BackendRegistry::from_config(config);
    let available = registry
        .iter()
        .filter(|d| credentials.is_available(d))
        .count();
    let name_width = registry.iter().map(|d| d.name.len()).max().unwrap_or(0);

    let mut out = format!(
        "Backends ({available} of {} available):\n",
        registry.len()
    );
    for descriptor in registry.iter() {
        let status = if credentials.is_available(descriptor) {
            "available".to_string()
        } else {
            format!("missing {}", descriptor.credential_env)
        };
        let marker = if descriptor.name == config.synthesis_backend() {
            " [synthesis]"
        } else {
            ""
        };
        out.push_str(&format!(
            "  {:<name_width$}  {}  {}{marker}\n",
            descriptor.name, descriptor.model, status
        ));

        if let Some(fallback) = &descriptor.fallback {
            let fallback_status = if credentials.lookup(&fallback.credential_env).is_some() {
                "available"
            } else {
                "missing"
            };
            out.push_str(&format!(
                "  {:<name_width$}    fallback: {} via {} ({fallback_status})\n",
                "", fallback.model, fallback.credential_env
            ));
        }
    }

    if registry.get(config.synthesis_backend()).is_none() {
        out.push_str(&format!(
            "\n⚠ synthesis backend '{}' is not registered\n",
            config.synthesis_backend()
        ));
    }

    if verbose {
        out.push_str("\nEffective configuration:\n");
        for (key, value, source) in config.effective_config() {
            out.push_str(&format!("  {key} = {value}  ({source})\n"));
        }
    }
    out
}

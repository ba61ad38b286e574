use std::path::PathBuf;

/// CLI overrides applied on top of file and default values.
///
/// Every field left `None` falls through to the next precedence level.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub call_timeout_secs: Option<u64>,
    pub run_timeout_secs: Option<u64>,
    pub synthesis_backend: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub verbose: Option<bool>,
}

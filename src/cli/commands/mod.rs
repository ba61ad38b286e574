//! CLI command implementations (facade).
//!
//! This module re-exports the command surface used by `run.rs`.
//! Implementations live in `commands/*`.

mod analyze;
mod backends;
mod query;

pub use analyze::{AnalyzeOptions, execute_analyze_command};
pub use backends::execute_backends_command;
pub use query::execute_query_command;

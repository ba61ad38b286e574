//! Command-line interface for conclave
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions and parsing structures (clap)
//! - `run`: Main entry point and command dispatch
//! - `commands`: Command implementations
//! - `console`: Per-phase progress lines for `analyze`

pub mod args;
mod commands;
pub mod console;
mod run;

// Re-export argument types
pub use args::{Cli, Commands};

// Re-export run function
pub use run::run;

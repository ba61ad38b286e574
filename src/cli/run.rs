//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Initializes tracing
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use anyhow::Result;
use clap::Parser;

use super::args::{Cli, Commands};
use super::commands::{self, AnalyzeOptions};

use crate::logging::init_tracing;
use crate::{ConclaveError, Config, ExitCode};
use conclave_error_redaction::redact_error_message;

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success: returns `Ok(())` after printing any output
/// - On error: prints the user-facing report to stderr, returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    let cli_args = cli.cli_args();

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = ConclaveError::from(err);
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    let verbose = config.verbose();
    if let Err(e) = init_tracing(verbose, cli.log_json) {
        eprintln!("⚠ Failed to initialize logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result: Result<()> = rt.block_on(async {
        match cli.command {
            Commands::Analyze {
                context,
                summary,
                details,
                out: _,
                json,
            } => {
                let options = AnalyzeOptions {
                    context_file: context,
                    summary,
                    details,
                    json,
                };
                commands::execute_analyze_command(&options, &config).await
            }
            Commands::Query {
                prompt,
                system,
                combined,
            } => {
                commands::execute_query_command(&prompt, system.as_deref(), combined, &config).await
            }
            Commands::Backends => commands::execute_backends_command(verbose, &config),
        }
    });

    if let Err(error) = result {
        if let Some(conclave_error) = error.downcast_ref::<ConclaveError>() {
            eprintln!("{}", redact_error_message(&conclave_error.display_for_user()));
            return Err(conclave_error.to_exit_code());
        }

        eprintln!(
            "✗ Unexpected error: {}",
            redact_error_message(&format!("{error:#}"))
        );
        eprintln!("\n  Run with --verbose for more detailed output");
        return Err(ExitCode::INTERNAL);
    }

    Ok(())
}

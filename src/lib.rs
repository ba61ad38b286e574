//! conclave - Multi-model ensemble pipeline for ambiguous technical problems
//!
//! conclave fans a problem description out to several independent LLM
//! backends at once, extracts structured signals from their free-text
//! answers, has them propose and cross-examine solution candidates, and
//! synthesizes one final recommendation.
//!
//! conclave can be used in two ways:
//! - **CLI**: Install via `cargo install conclave` and run from command line
//! - **Library**: Add as a dependency and drive [`Pipeline`] directly
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Which backends have credentials?
//! conclave backends --verbose
//!
//! # Run the full four-phase pipeline on a context file
//! conclave analyze --context problem.toml --out analysis_results
//!
//! # Quick fan-out of one prompt
//! conclave query "Why would a CADisplayLink stop firing?" --combined
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use conclave::{CliArgs, Config, Ensemble, NoopSink, Pipeline, PipelineSettings, ProblemContext};
//! use conclave::llm::EnvCredentials;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::discover(&CliArgs::default())?;
//!     let ensemble = Ensemble::from_config(&config, &EnvCredentials)?;
//!     let context = ProblemContext::new("Touch events are dropped after resume");
//!
//!     let record = Pipeline::new(&ensemble, PipelineSettings::from_config(&config))
//!         .run(&context, &NoopSink)
//!         .await?;
//!     println!("{}", record.final_code);
//!     Ok(())
//! }
//! ```
//!
//! # Stable Public API
//!
//! - [`Pipeline`], [`PipelineSettings`] and [`RunRecord`] - running the pipeline
//! - [`Ensemble`] and [`summarize`] - direct fan-out
//! - [`ProblemContext`] and [`PhaseId`] - pipeline input and phase names
//! - [`PhaseSink`] with [`NoopSink`] and [`TracingSink`] - per-phase reports
//! - [`Config`] and [`ConfigBuilder`] - configuration management
//! - [`ConclaveError`] and [`ExitCode`] - error reporting
//!
//! Internal modules are accessible via module paths but are marked `#[doc(hidden)]`
//! and are not covered by semver stability guarantees.

// ============================================================================
// Stable Public API
// ============================================================================

/// Drives one problem through all four phases.
pub use conclave_orchestrator::{Pipeline, PipelineSettings, RunRecord};

/// The set of credentialed backends and the fan-out over them.
pub use conclave_ensemble::{Ensemble, EnsembleResponses, summarize};

/// Pipeline input, phase identifiers and per-phase reports.
pub use conclave_phase_api::{
    NoopSink, PhaseId, PhasePayload, PhaseReport, PhaseSink, ProblemContext, TracingSink,
};

/// Configuration for conclave operations.
///
/// Use [`Config::discover()`] for CLI-like behavior or [`Config::builder()`]
/// for programmatic configuration in embedding scenarios.
///
/// ```rust,no_run
/// use conclave::Config;
/// use std::time::Duration;
///
/// let config = Config::builder()
///     .synthesis_backend("anthropic")
///     .call_timeout(Duration::from_secs(60))
///     .build()
///     .expect("Failed to build config");
/// ```
pub use conclave_config::{CliArgs, Config, ConfigBuilder};

/// Library-level error type; map to a process exit code with
/// [`to_exit_code()`](ConclaveError::to_exit_code).
pub use conclave_utils::error::{ConclaveError, ErrorCategory, UserFriendlyError};

/// Exit codes matching the documented exit code table.
pub use conclave_utils::exit_codes::ExitCode;

// ============================================================================
// Internal modules - accessible but not stable
// ============================================================================

#[doc(hidden)]
pub use conclave_config as config;
#[doc(hidden)]
pub use conclave_extraction as extraction;
#[doc(hidden)]
pub use conclave_llm as llm;
#[doc(hidden)]
pub use conclave_phases as phases;
#[doc(hidden)]
pub use conclave_utils::{atomic_write, error, exit_codes, logging};

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use conclave_ensemble::testing;
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use conclave_phase_api::CollectingSink;

pub mod context;
pub mod transcript;

// CLI module - internal implementation detail, exported for white-box tests
// of flag parsing only
#[doc(hidden)]
pub mod cli;

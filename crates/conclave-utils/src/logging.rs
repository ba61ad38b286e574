//! Logging and observability infrastructure for conclave
//!
//! Structured logging via `tracing`. Each pipeline phase runs inside a
//! `phase_execution` span carrying the run id and phase name; backend
//! failures are logged with their messages redacted.

use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use conclave_error_redaction::redact_error_message_for_logging;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects between
/// `conclave=debug,info` and `conclave=info,warn`. `json` switches the
/// formatter to one JSON object per line.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("conclave=debug,info")
            } else {
                EnvFilter::try_new("conclave=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Create a span for phase execution with structured fields
#[must_use]
pub fn phase_span(run_id: &str, phase: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "phase_execution",
        run_id = %run_id,
        phase = %phase,
    )
}

/// Log phase start with structured fields
pub fn log_phase_start(run_id: &str, phase: &str, backends: usize) {
    info!(
        run_id = %run_id,
        phase = %phase,
        backends,
        "Starting phase execution"
    );
}

/// Log phase completion with duration and how many backends answered
pub fn log_phase_complete(run_id: &str, phase: &str, responded: usize, duration_ms: u128) {
    info!(
        run_id = %run_id,
        phase = %phase,
        responded,
        duration_ms = %duration_ms,
        "Phase execution completed"
    );
}

/// Log phase error with context.
///
/// Error messages are redacted before they reach the subscriber.
pub fn log_phase_error(run_id: &str, phase: &str, error: &str, duration_ms: u128) {
    let sanitized_error = redact_error_message_for_logging(error);

    error!(
        run_id = %run_id,
        phase = %phase,
        duration_ms = %duration_ms,
        error = %sanitized_error,
        "Phase execution failed"
    );
}

//! Run transcript persistence
//!
//! A completed [`RunRecord`] is written as pretty JSON to
//! `<dir>/analysis_<YYYYmmdd_HHMMSS>.json` through an atomic temp-file
//! rename, so a reader never observes a partial document.

use conclave_orchestrator::RunRecord;
use conclave_utils::atomic_write::write_file_atomic;
use conclave_utils::error::ConclaveError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `record` into `dir` and return the transcript path.
///
/// # Errors
///
/// `TranscriptWriteFailed` if serialization or the atomic write fails.
pub fn write_transcript(record: &RunRecord, dir: &Path) -> Result<PathBuf, ConclaveError> {
    let path = dir.join(record.transcript_file_name());
    let failed = |reason: String| ConclaveError::TranscriptWriteFailed {
        path: path.display().to_string(),
        reason,
    };

    let json = serde_json::to_string_pretty(record).map_err(|e| failed(e.to_string()))?;
    write_file_atomic(&path, &json).map_err(|e| failed(format!("{e:#}")))?;

    info!(run_id = %record.run_id, path = %path.display(), "Transcript written");
    Ok(path)
}

//! Atomic file writes (temp file + fsync + rename)
//!
//! Run transcripts are written through here so a crash never leaves a
//! half-written JSON document in the output directory.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically write content to a file.
///
/// Parent directories are created as needed. Line endings are normalized to LF.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the
/// temporary file cannot be written, synced or persisted.
pub fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let normalized_content = normalize_line_endings(content);

    let temp_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory: {}", parent.display())
            })?;
            parent
        }
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("Failed to create temporary file in: {}", temp_dir.display()))?;

    temp_file
        .write_all(normalized_content.as_bytes())
        .context("Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;

    temp_file
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to atomically write file: {}", path.display()))?;

    Ok(())
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

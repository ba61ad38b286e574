//! Loading the problem context for `conclave analyze`
//!
//! A context comes from a TOML or JSON file, from `--summary`/`--detail`
//! flags, or from stdin, in that order of preference. Flags refine a file:
//! `--summary` replaces the file's summary and each `--detail` is appended
//! after the file's details.
//!
//! File shape (TOML shown, JSON uses the same keys):
//!
//! ```toml
//! summary = "Touch events are dropped after the app resumes"
//!
//! [details]
//! platform = "iOS 17"
//! framework = "UIKit"
//! ```
//!
//! A `[details]` table is read in key order. To control ordering, write
//! `details` as a list of `{ key, value }` entries instead.

use conclave_phase_api::{ContextDetail, ProblemContext};
use conclave_utils::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContextFile {
    summary: String,
    #[serde(default)]
    details: Option<DetailsInput>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailsInput {
    List(Vec<ContextDetail>),
    Table(BTreeMap<String, serde_json::Value>),
}

impl DetailsInput {
    fn into_details(self) -> Vec<ContextDetail> {
        match self {
            Self::List(details) => details,
            Self::Table(table) => table
                .into_iter()
                .map(|(key, value)| ContextDetail {
                    key,
                    value: match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    },
                })
                .collect(),
        }
    }
}

/// Read a context file. `.json` files are parsed as JSON, anything else as TOML.
///
/// # Errors
///
/// `NotFound` if the file cannot be read, `InvalidFile` if it does not parse.
pub fn load_context_file(path: &Path) -> Result<ProblemContext, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
        path: path.display().to_string(),
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let file: ContextFile = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))?
    };

    Ok(ProblemContext {
        summary: file.summary,
        details: file
            .details
            .map(DetailsInput::into_details)
            .unwrap_or_default(),
    })
}

/// Parse one `KEY=VALUE` detail flag. Only the first `=` splits.
///
/// # Errors
///
/// `InvalidValue` when there is no `=` or the key is empty.
pub fn parse_detail(raw: &str) -> Result<ContextDetail, ConfigError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok(ContextDetail {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        }),
        _ => Err(ConfigError::InvalidValue {
            key: "detail".to_string(),
            value: format!("'{raw}' is not in KEY=VALUE form"),
        }),
    }
}

/// Build the context from whichever inputs were given.
///
/// `stdin` is only read when neither a file nor `--summary` supplied a
/// summary.
///
/// # Errors
///
/// File and detail errors as above; `InvalidValue` if the resulting
/// summary is empty.
pub fn resolve_context(
    file: Option<&Path>,
    summary: Option<&str>,
    details: &[String],
    stdin: impl Read,
) -> Result<ProblemContext, ConfigError> {
    let mut context = match file {
        Some(path) => load_context_file(path)?,
        None => ProblemContext::default(),
    };

    if let Some(summary) = summary {
        context.summary = summary.to_string();
    } else if file.is_none() {
        let mut buf = String::new();
        let mut stdin = stdin;
        stdin
            .read_to_string(&mut buf)
            .map_err(|e| ConfigError::InvalidValue {
                key: "summary".to_string(),
                value: format!("failed to read stdin: {e}"),
            })?;
        context.summary = buf;
    }

    for raw in details {
        context.details.push(parse_detail(raw)?);
    }

    if context.summary.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "summary".to_string(),
            value: "problem summary is empty; pass --context, --summary or pipe text on stdin"
                .to_string(),
        });
    }

    Ok(context)
}

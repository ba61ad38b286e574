//! Query command implementation
//!
//! Handles `conclave query PROMPT`: one fan-out, no phases, no transcript.

use anyhow::Result;
use tokio::time::Instant;

use crate::llm::EnvCredentials;
use crate::{ConclaveError, Config, Ensemble, EnsembleResponses, summarize};
use conclave_ensemble::NO_BACKENDS_SENTINEL;

/// Characters of each response shown without `--combined`.
pub const QUERY_EXCERPT_CHARS: usize = 2000;

/// Execute the query command
pub async fn execute_query_command(
    prompt: &str,
    system: Option<&str>,
    combined: bool,
    config: &Config,
) -> Result<()> {
    let ensemble = Ensemble::from_config(config, &EnvCredentials).map_err(ConclaveError::from)?;
    let deadline = config.run_timeout().map(|t| Instant::now() + t);

    println!("Query: {prompt}\n");
    let responses = ensemble.dispatch_all(prompt, system, deadline).await;

    if combined {
        println!("{}", summarize(&responses));
    } else {
        print!("{}", render_excerpts(&responses));
    }
    Ok(())
}

/// First `max_chars` characters of `text`, and whether anything was cut.
pub fn excerpt(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

fn render_excerpts(responses: &EnsembleResponses) -> String {
    if responses.is_empty() {
        return format!("{NO_BACKENDS_SENTINEL}\n");
    }

    let rule = "=".repeat(70);
    let mut out = String::new();
    for (name, response) in responses.iter() {
        let (shown, truncated) = excerpt(&response.content, QUERY_EXCERPT_CHARS);
        out.push_str(&format!(
            "\n{rule}\n{} ({})\n{rule}\n{shown}\n",
            name.to_uppercase(),
            response.model
        ));
        if truncated {
            out.push_str("\n... (truncated)\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_llm::ModelResponse;

    #[test]
    fn test_excerpt_counts_chars_not_bytes() {
        let text = "é".repeat(5);
        let (shown, truncated) = excerpt(&text, 3);
        assert_eq!(shown, "ééé");
        assert!(truncated);

        assert_eq!(excerpt("short", 10), ("short", false));
        assert_eq!(excerpt("exact", 5), ("exact", false));
    }

    #[test]
    fn test_render_excerpts_marks_truncation() {
        let responses: EnsembleResponses = [
            (
                "arcee".to_string(),
                ModelResponse::new("x".repeat(QUERY_EXCERPT_CHARS + 1), "trinity"),
            ),
            ("qwen".to_string(), ModelResponse::new("short", "qwen3-coder")),
        ]
        .into_iter()
        .collect();

        let out = render_excerpts(&responses);

        assert!(out.contains("ARCEE (trinity)"));
        assert!(out.contains("QWEN (qwen3-coder)\n"));
        assert_eq!(out.matches("... (truncated)").count(), 1);
        assert!(!out.contains(&"x".repeat(QUERY_EXCERPT_CHARS + 1)));
    }

    #[test]
    fn test_render_excerpts_empty() {
        assert_eq!(
            render_excerpts(&EnsembleResponses::new()),
            format!("{NO_BACKENDS_SENTINEL}\n")
        );
    }
}

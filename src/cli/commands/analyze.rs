//! Analyze command implementation
//!
//! Handles `conclave analyze`: resolve the problem context, run all four
//! phases, write the transcript, then print either the summary or the
//! run record as JSON. A failed synthesis call still writes and prints the
//! record before the command reports the failure.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::console::ConsoleSink;
use crate::context::resolve_context;
use crate::llm::EnvCredentials;
use crate::transcript::write_transcript;
use crate::{
    ConclaveError, Config, Ensemble, PhaseSink, Pipeline, PipelineSettings, RunRecord, TracingSink,
};

/// Inputs collected from the `analyze` subcommand flags
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub context_file: Option<PathBuf>,
    pub summary: Option<String>,
    pub details: Vec<String>,
    pub json: bool,
}

/// Execute the analyze command
pub async fn execute_analyze_command(options: &AnalyzeOptions, config: &Config) -> Result<()> {
    let context = resolve_context(
        options.context_file.as_deref(),
        options.summary.as_deref(),
        &options.details,
        std::io::stdin(),
    )
    .map_err(ConclaveError::from)?;

    let ensemble = Ensemble::from_config(config, &EnvCredentials).map_err(ConclaveError::from)?;
    if !options.json {
        let names: Vec<&str> = ensemble.available().collect();
        println!(
            "Ensemble: {} of {} backends available ({})",
            names.len(),
            ensemble.members().count(),
            names.join(", ")
        );
    }

    // Keep stdout clean for the JSON document.
    let sink: &dyn PhaseSink = if options.json {
        &TracingSink
    } else {
        &ConsoleSink
    };

    let record = Pipeline::new(&ensemble, PipelineSettings::from_config(config))
        .run(&context, sink)
        .await
        .map_err(ConclaveError::from)?;

    let transcript = write_transcript(&record, &config.output_dir())?;

    if options.json {
        let json = serde_json::to_string_pretty(&record).context("Failed to emit run record JSON")?;
        println!("{json}");
    } else {
        print!("{}", render_summary(&record, &transcript));
    }

    record.synthesis_result().map_err(ConclaveError::from)?;
    Ok(())
}

fn render_summary(record: &RunRecord, transcript: &Path) -> String {
    let rule = "=".repeat(70);
    let mut out = format!("\n{rule}\nFINAL RECOMMENDATION\n{rule}\n");
    out.push_str(&format!(
        "Success confidence: {}/10\n",
        record.success_confidence
    ));
    out.push_str(&format!(
        "Recommended candidate: {}\n",
        record.recommended_candidate
    ));

    out.push_str("\nFinal code:\n");
    if let Some(reason) = &record.synthesis_error {
        out.push_str(&format!("(synthesis failed: {reason})\n"));
    } else if record.final_code.is_empty() {
        out.push_str("(no code block in the synthesis response)\n");
    } else {
        out.push_str(&format!("```\n{}\n```\n", record.final_code.trim_end()));
    }

    if !record.explanation.is_empty() {
        out.push_str(&format!("\nExplanation:\n{}\n", record.explanation));
    }

    out.push_str("\nAll candidates:\n");
    for (index, candidate) in record.candidates.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} (success {}/10)\n",
            index + 1,
            candidate.source,
            candidate.estimated_success_chance
        ));
        for pro in &candidate.pros {
            out.push_str(&format!("     + {pro}\n"));
        }
        for con in &candidate.cons {
            out.push_str(&format!("     - {con}\n"));
        }
    }

    out.push_str(&format!("\nTranscript: {}\n", transcript.display()));
    out
}

//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and the subcommand enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::CliArgs;

/// conclave - multi-model ensemble pipeline
#[derive(Parser, Debug)]
#[command(name = "conclave")]
#[command(about = "Ask an ensemble of LLM backends, cross-examine their answers, synthesize one")]
#[command(long_about = r#"
conclave fans a technical problem out to several LLM backends at once,
extracts structured signals from their answers, has them propose and
cross-validate solution candidates, and synthesizes a final recommendation.

EXAMPLES:
  # Run the full pipeline on a context file
  conclave analyze --context problem.toml

  # Build the context from flags instead
  conclave analyze --summary "Touches stop registering" --detail platform="iOS 17"

  # Pipe the problem on stdin and print the run record as JSON
  cat problem.txt | conclave analyze --json

  # Quick fan-out of a single prompt
  conclave query "Explain CADisplayLink pausing" --combined

  # Show which backends have credentials
  conclave backends --verbose

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .conclave/config.toml
  Use --config to specify an explicit config file path

PHASES:
  Analyze → GenerateCandidates → CrossValidate → Synthesize
  The first three fan out to every credentialed backend; Synthesize asks one.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Sampling temperature for every backend call (0.0 - 2.0)
    #[arg(long, global = true)]
    pub temperature: Option<f64>,

    /// Maximum tokens per backend response
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Per-call timeout in seconds (default: 120, min: 5)
    #[arg(long, global = true)]
    pub call_timeout: Option<u64>,

    /// Pipeline-wide deadline in seconds
    #[arg(long, global = true)]
    pub run_timeout: Option<u64>,

    /// Backend that performs the final synthesis
    #[arg(long, global = true)]
    pub synthesis_backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the four-phase pipeline and save the run record
    Analyze {
        /// TOML or JSON file with `summary` and `details`
        #[arg(long)]
        context: Option<PathBuf>,

        /// Problem summary (overrides the context file's summary)
        #[arg(long)]
        summary: Option<String>,

        /// Extra context fact as KEY=VALUE (repeatable)
        #[arg(long = "detail", value_name = "KEY=VALUE")]
        details: Vec<String>,

        /// Directory for the run transcript (default: analysis_results)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the run record as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Send one prompt to every available backend
    Query {
        /// Prompt text
        prompt: String,

        /// System prompt forwarded with the request
        #[arg(long)]
        system: Option<String>,

        /// Print one combined document instead of per-backend excerpts
        #[arg(long)]
        combined: bool,
    },

    /// List registered backends and their credential status
    Backends,
}

impl Cli {
    /// Configuration overrides carried by the global flags.
    #[must_use]
    pub fn cli_args(&self) -> CliArgs {
        let output_dir = match &self.command {
            Commands::Analyze { out, .. } => out.clone(),
            _ => None,
        };

        CliArgs {
            config_path: self.config.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            call_timeout_secs: self.call_timeout,
            run_timeout_secs: self.run_timeout,
            synthesis_backend: self.synthesis_backend.clone(),
            output_dir,
            verbose: self.verbose.then_some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::try_parse_from([
            "conclave",
            "analyze",
            "--summary",
            "events dropped",
            "--detail",
            "os=iOS 17",
            "--detail",
            "arch=arm64",
            "--out",
            "runs",
            "--json",
        ])
        .unwrap();

        match &cli.command {
            Commands::Analyze {
                summary,
                details,
                json,
                ..
            } => {
                assert_eq!(summary.as_deref(), Some("events dropped"));
                assert_eq!(details, &vec!["os=iOS 17".to_string(), "arch=arm64".to_string()]);
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.cli_args().output_dir, Some(PathBuf::from("runs")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "conclave",
            "query",
            "why?",
            "--temperature",
            "0.2",
            "--call-timeout",
            "30",
            "--synthesis-backend",
            "qwen",
            "-v",
        ])
        .unwrap();

        let args = cli.cli_args();
        assert_eq!(args.temperature, Some(0.2));
        assert_eq!(args.call_timeout_secs, Some(30));
        assert_eq!(args.synthesis_backend.as_deref(), Some("qwen"));
        assert_eq!(args.verbose, Some(true));
        assert_eq!(args.output_dir, None);
    }

    #[test]
    fn test_verbose_absent_does_not_override_config() {
        let cli = Cli::try_parse_from(["conclave", "backends"]).unwrap();
        assert_eq!(cli.cli_args().verbose, None);
    }

    #[test]
    fn test_query_requires_prompt() {
        assert!(Cli::try_parse_from(["conclave", "query"]).is_err());
    }
}

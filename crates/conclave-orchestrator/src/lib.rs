//! Orchestrator for conclave pipeline runs
//!
//! This crate wires the ensemble dispatcher, the fan-out phases and the
//! directed synthesis call into one sequential run that yields a
//! [`RunRecord`].
//!
//! # Module Organization
//!
//! - `pipeline.rs`: Phase sequencing, run deadline and sink publication
//! - `synthesize.rs`: Seed selection and the synthesis prompt
//! - `record.rs`: The immutable result of a completed run
//!
//! Transcript persistence lives with the CLI; this crate never writes files.
//!
//! ## Example
//!
//! ```rust,no_run
//! use conclave_config::{CliArgs, Config};
//! use conclave_ensemble::Ensemble;
//! use conclave_llm::EnvCredentials;
//! use conclave_orchestrator::{Pipeline, PipelineSettings};
//! use conclave_phase_api::{ProblemContext, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::discover(&CliArgs::default())?;
//!     let ensemble = Ensemble::from_config(&config, &EnvCredentials)?;
//!
//!     let context = ProblemContext::new("Touch events are dropped after resume")
//!         .with_detail("platform", "iOS 17");
//!     let record = Pipeline::new(&ensemble, PipelineSettings::from_config(&config))
//!         .run(&context, &TracingSink)
//!         .await?;
//!
//!     println!("Recommended: {}", record.recommended_candidate);
//!     Ok(())
//! }
//! ```

mod pipeline;
mod record;
mod synthesize;

pub use pipeline::{Pipeline, PipelineSettings};
pub use record::RunRecord;
pub use synthesize::{select_seed, synthesis_failure, synthesis_outcome, synthesis_prompt};

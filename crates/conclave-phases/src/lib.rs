//! Fan-out phases of the conclave pipeline
//!
//! Each phase builds one prompt from the previous phase's output and
//! reduces whatever subset of the ensemble answered through the heuristic
//! extractor. Dispatch is left to the orchestrator.

mod aggregate;
mod analyze;
mod candidates;
mod validate;

pub use aggregate::{MAX_SHARED_INSIGHTS, aggregate_ratings, find_consensus};
pub use analyze::AnalyzePhase;
pub use candidates::GenerateCandidatesPhase;
pub use validate::CrossValidatePhase;

//! Phase contract for the conclave pipeline
//!
//! This crate holds what the orchestrator and the phase implementations
//! share: phase identifiers, the typed records each phase produces, the
//! [`EnsemblePhase`] trait, and the [`PhaseSink`] publish boundary.
//!
//! # Phase Order
//!
//! ```text
//! Analyze → GenerateCandidates → CrossValidate → Synthesize → Done
//! ```
//!
//! There are no backward transitions; each phase consumes the previous
//! phase's output.

use conclave_ensemble::EnsembleResponses;
use serde::{Deserialize, Serialize};
use std::fmt;

mod records;
mod sink;

pub use records::{
    AggregatedRating, AnalysisOutcome, AnalysisResult, Consensus, ContextDetail, ProblemContext,
    SolutionCandidate, SynthesisOutcome, ValidationOutcome, ValidationRecord,
};
#[cfg(any(test, feature = "test-utils"))]
pub use sink::CollectingSink;
pub use sink::{NoopSink, PhasePayload, PhaseReport, PhaseSink, TracingSink};

/// Pipeline states, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    /// Every backend reads the problem independently.
    Analyze,
    /// Every backend proposes a solution from the analysis consensus.
    GenerateCandidates,
    /// Every backend critiques and rates the candidate set.
    CrossValidate,
    /// One designated backend refines the best candidate.
    Synthesize,
    /// Terminal state.
    Done,
}

impl PhaseId {
    /// Canonical lowercase name used in logs, reports, and the run record.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::GenerateCandidates => "generate_candidates",
            Self::CrossValidate => "cross_validate",
            Self::Synthesize => "synthesize",
            Self::Done => "done",
        }
    }

    /// The state that follows this one. `Done` has no successor.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Analyze => Some(Self::GenerateCandidates),
            Self::GenerateCandidates => Some(Self::CrossValidate),
            Self::CrossValidate => Some(Self::Synthesize),
            Self::Synthesize => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// 1-based position for operator-facing progress lines.
    #[must_use]
    pub const fn number(&self) -> Option<u8> {
        match self {
            Self::Analyze => Some(1),
            Self::GenerateCandidates => Some(2),
            Self::CrossValidate => Some(3),
            Self::Synthesize => Some(4),
            Self::Done => None,
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase that fans one prompt out to the whole ensemble
///
/// Separates the two pure halves of a fan-out phase:
/// - `prompt()`: build the prompt from the previous phase's output
/// - `postprocess()`: reduce whatever subset of backends answered
///
/// Dispatch itself is the orchestrator's job, so both halves stay
/// synchronous and testable without a runtime.
pub trait EnsemblePhase {
    type Input: ?Sized;
    type Output;

    fn id(&self) -> PhaseId;

    fn prompt(&self, input: &Self::Input) -> String;

    /// Reduce the responses. Must produce a well-formed output for an empty
    /// response set.
    fn postprocess(&self, input: &Self::Input, responses: &EnsembleResponses) -> Self::Output;
}

use chrono::{DateTime, Utc};
use conclave_phase_api::{
    AggregatedRating, AnalysisResult, Consensus, ProblemContext, SolutionCandidate,
    ValidationRecord,
};
use conclave_utils::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Everything one pipeline execution produced.
///
/// Built once when the run completes and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub context: ProblemContext,
    pub analysis: Vec<AnalysisResult>,
    pub consensus: Consensus,
    pub candidates: Vec<SolutionCandidate>,
    pub validations: Vec<ValidationRecord>,
    pub aggregated_ratings: Vec<AggregatedRating>,
    pub final_code: String,
    pub explanation: String,
    /// Source backend of the seed candidate
    pub recommended_candidate: String,
    /// The seed candidate's own estimated success chance, 1..=10
    pub success_confidence: u8,
    /// Set when the synthesis call failed; `final_code` is empty then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,
}

impl RunRecord {
    /// File name the transcript writer uses for this run.
    #[must_use]
    pub fn transcript_file_name(&self) -> String {
        format!(
            "analysis_{}.json",
            self.timestamp.format("%Y%m%d_%H%M%S_%3f")
        )
    }

    /// `SynthesisIncomplete` if the run ended without a synthesized answer.
    ///
    /// # Errors
    ///
    /// Returns the recorded synthesis failure, if any.
    pub fn synthesis_result(&self) -> Result<(), PipelineError> {
        match &self.synthesis_error {
            Some(reason) => Err(PipelineError::SynthesisIncomplete {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

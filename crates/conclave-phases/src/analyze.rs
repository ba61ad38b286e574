use conclave_ensemble::EnsembleResponses;
use conclave_extraction::{
    extract_approach, extract_confidence, extract_insights, extract_issues, has_code,
};
use conclave_phase_api::{AnalysisOutcome, AnalysisResult, EnsemblePhase, PhaseId, ProblemContext};
use tracing::debug;

use crate::aggregate::find_consensus;

/// Every backend analyzes the problem on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzePhase;

impl AnalyzePhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EnsemblePhase for AnalyzePhase {
    type Input = ProblemContext;
    type Output = AnalysisOutcome;

    fn id(&self) -> PhaseId {
        PhaseId::Analyze
    }

    fn prompt(&self, context: &ProblemContext) -> String {
        format!(
            r"Analyze this technical problem:

{}

Your task:
1. Identify all possible causes for the failure
2. Suggest diagnostic steps to narrow down the issue
3. Rate each potential cause by likelihood (1-10)
4. Provide the most likely root cause and your overall confidence (1-10)

List key insights and potential issues as bullet points.
Be specific and technical. Think step by step.",
            context.render()
        )
    }

    fn postprocess(
        &self,
        _context: &ProblemContext,
        responses: &EnsembleResponses,
    ) -> AnalysisOutcome {
        let results: Vec<AnalysisResult> = responses
            .iter()
            .map(|(backend, response)| {
                let text = response.content.as_str();
                let result = AnalysisResult {
                    backend: backend.to_string(),
                    approach: extract_approach(text),
                    confidence: extract_confidence(text),
                    code_provided: has_code(text),
                    key_insights: extract_insights(text),
                    potential_issues: extract_issues(text),
                    raw_response: response.content.clone(),
                };
                debug!(
                    backend,
                    approach = %result.approach,
                    confidence = result.confidence,
                    insights = result.key_insights.len(),
                    "Analysis extracted"
                );
                result
            })
            .collect();

        let consensus = find_consensus(&results);
        AnalysisOutcome { results, consensus }
    }
}

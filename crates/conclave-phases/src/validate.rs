use conclave_ensemble::EnsembleResponses;
use conclave_extraction::extract_candidate_ratings;
use conclave_phase_api::{
    EnsemblePhase, PhaseId, ProblemContext, SolutionCandidate, ValidationOutcome, ValidationRecord,
};
use tracing::debug;

use crate::aggregate::aggregate_ratings;

/// Every backend critiques and rates the whole candidate set.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidatePhase<'a> {
    context: &'a ProblemContext,
}

impl<'a> CrossValidatePhase<'a> {
    #[must_use]
    pub const fn new(context: &'a ProblemContext) -> Self {
        Self { context }
    }
}

fn candidate_summary(ordinal: usize, candidate: &SolutionCandidate) -> String {
    format!(
        "CANDIDATE {ordinal} ({}):\nPros: {}\nCons: {}\nEstimated Success: {}/10\n---",
        candidate.source,
        candidate.pros.join(", "),
        candidate.cons.join(", "),
        candidate.estimated_success_chance
    )
}

impl EnsemblePhase for CrossValidatePhase<'_> {
    type Input = [SolutionCandidate];
    type Output = ValidationOutcome;

    fn id(&self) -> PhaseId {
        PhaseId::CrossValidate
    }

    fn prompt(&self, candidates: &[SolutionCandidate]) -> String {
        let summaries: Vec<String> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| candidate_summary(index + 1, candidate))
            .collect();

        format!(
            r"Validate these candidate solutions for the following problem:

{}

{}

For each candidate:
1. Identify potential bugs or issues
2. Check whether the stated requirements are met
3. Suggest improvements
4. Rate final viability (1-10), written as `Candidate N: R/10`

Which candidate is most likely to work and why?",
            self.context.render(),
            summaries.join("\n\n")
        )
    }

    fn postprocess(
        &self,
        candidates: &[SolutionCandidate],
        responses: &EnsembleResponses,
    ) -> ValidationOutcome {
        let validations: Vec<ValidationRecord> = responses
            .iter()
            .map(|(backend, response)| {
                let ratings = extract_candidate_ratings(&response.content, candidates.len());
                debug!(backend, rated = ratings.len(), "Critique extracted");
                ValidationRecord {
                    backend: backend.to_string(),
                    critique: response.content.clone(),
                    ratings,
                }
            })
            .collect();

        let aggregated_ratings = aggregate_ratings(&validations, candidates);
        ValidationOutcome {
            validations,
            aggregated_ratings,
        }
    }
}

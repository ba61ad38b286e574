use conclave_ensemble::EnsembleResponses;
use conclave_extraction::{
    extract_code, extract_confidence, extract_cons, extract_description, extract_pros,
};
use conclave_phase_api::{Consensus, EnsemblePhase, PhaseId, ProblemContext, SolutionCandidate};
use tracing::debug;

/// Every backend proposes a complete solution, guided by the analysis consensus.
#[derive(Debug, Clone, Copy)]
pub struct GenerateCandidatesPhase<'a> {
    context: &'a ProblemContext,
}

impl<'a> GenerateCandidatesPhase<'a> {
    #[must_use]
    pub const fn new(context: &'a ProblemContext) -> Self {
        Self { context }
    }
}

impl EnsemblePhase for GenerateCandidatesPhase<'_> {
    type Input = Consensus;
    type Output = Vec<SolutionCandidate>;

    fn id(&self) -> PhaseId {
        PhaseId::GenerateCandidates
    }

    fn prompt(&self, consensus: &Consensus) -> String {
        let consensus_json = serde_json::to_string_pretty(consensus).unwrap_or_default();
        format!(
            r"Generate a COMPLETE, WORKING solution for this problem:

{}

PROBLEM CONSENSUS:
{consensus_json}

REQUIREMENTS:
1. Complete implementation in a single fenced code block
2. All required imports or headers
3. Proper initialization sequence
4. Error handling
5. Comments explaining key parts

Then list the pros and cons of your solution as bullet points and state
your estimated chance of success as N/10.

If you're unsure about a specific detail, indicate it clearly.

Provide the complete solution now.",
            self.context.render()
        )
    }

    fn postprocess(
        &self,
        _consensus: &Consensus,
        responses: &EnsembleResponses,
    ) -> Vec<SolutionCandidate> {
        responses
            .iter()
            .map(|(source, response)| {
                let text = response.content.as_str();
                let candidate = SolutionCandidate {
                    source: source.to_string(),
                    code: extract_code(text),
                    description: extract_description(text),
                    pros: extract_pros(text),
                    cons: extract_cons(text),
                    estimated_success_chance: extract_confidence(text),
                };
                debug!(
                    source,
                    code_chars = candidate.code.len(),
                    success_chance = candidate.estimated_success_chance,
                    "Candidate extracted"
                );
                candidate
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_extraction::Approach;
    use conclave_llm::ModelResponse;

    #[test]
    fn test_prompt_embeds_consensus() {
        let context = ProblemContext::new("Events are dropped");
        let consensus = Consensus {
            most_common_approach: Approach::QueueFix,
            average_confidence: 7.0,
            shared_insights: vec!["use the main queue".to_string()],
            total_analyses: 3,
        };
        let prompt = GenerateCandidatesPhase::new(&context).prompt(&consensus);
        assert!(prompt.contains("Events are dropped"));
        assert!(prompt.contains("\"most_common_approach\": \"queue_fix\""));
        assert!(prompt.contains("use the main queue"));
    }

    #[test]
    fn test_postprocess_builds_candidates() {
        let context = ProblemContext::new("p");
        let responses: EnsembleResponses = [(
            "qwen".to_string(),
            ModelResponse::new(
                "# Fix\nRe-dispatch on the main queue.\n```objc\n[q run];\n```\nPros:\n- minimal change\nCons:\n- adds latency\nSuccess: 8/10",
                "qwen3-coder",
            ),
        )]
        .into_iter()
        .collect();

        let candidates =
            GenerateCandidatesPhase::new(&context).postprocess(&Consensus::default(), &responses);

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.source, "qwen");
        assert_eq!(candidate.code, "[q run];\n");
        assert!(candidate.description.starts_with("Re-dispatch on the main queue."));
        assert_eq!(candidate.pros, vec!["minimal change", "adds latency"]);
        assert_eq!(candidate.cons, vec!["adds latency"]);
        assert_eq!(candidate.estimated_success_chance, 8);
    }

    #[test]
    fn test_postprocess_empty() {
        let context = ProblemContext::new("p");
        let candidates = GenerateCandidatesPhase::new(&context)
            .postprocess(&Consensus::default(), &EnsembleResponses::new());
        assert!(candidates.is_empty());
    }
}

//! Synthesize phase helpers
//!
//! Unlike the fan-out phases, synthesis narrows to one designated backend,
//! so it is driven directly by the pipeline rather than through
//! `EnsemblePhase`.

use conclave_extraction::{extract_code, extract_description};
use conclave_phase_api::{ProblemContext, SolutionCandidate, SynthesisOutcome, ValidationRecord};

/// Pick the candidate with the highest estimated success chance.
///
/// Ties go to the earliest candidate. Returns `None` for an empty list.
#[must_use]
pub fn select_seed(candidates: &[SolutionCandidate]) -> Option<&SolutionCandidate> {
    let mut seed: Option<&SolutionCandidate> = None;
    for candidate in candidates {
        if seed.is_none_or(|s| candidate.estimated_success_chance > s.estimated_success_chance) {
            seed = Some(candidate);
        }
    }
    seed
}

#[must_use]
pub fn synthesis_prompt(
    context: &ProblemContext,
    seed: &SolutionCandidate,
    validations: &[ValidationRecord],
) -> String {
    let feedback = serde_json::to_string_pretty(validations).unwrap_or_default();
    format!(
        r"Create the FINAL, OPTIMIZED solution for this problem:

{}

BEST CANDIDATE ({}):
```
{}
```

VALIDATION FEEDBACK:
{feedback}

Your task:
1. Incorporate fixes from validation feedback
2. Optimize the code for the stated environment
3. Add any missing error handling
4. Ensure every stated requirement is met
5. Make it production-ready

Provide the complete, final implementation.",
        context.render(),
        seed.source,
        seed.code.trim_end()
    )
}

/// Terminal fields of the run, from the synthesis response and the seed.
#[must_use]
pub fn synthesis_outcome(seed: &SolutionCandidate, response: &str) -> SynthesisOutcome {
    SynthesisOutcome {
        final_code: extract_code(response),
        explanation: extract_description(response),
        recommended_candidate: seed.source.clone(),
        success_confidence: seed.estimated_success_chance,
        error: None,
    }
}

/// Terminal fields when the synthesis call did not return.
#[must_use]
pub fn synthesis_failure(seed: &SolutionCandidate, reason: impl Into<String>) -> SynthesisOutcome {
    SynthesisOutcome {
        final_code: String::new(),
        explanation: String::new(),
        recommended_candidate: seed.source.clone(),
        success_confidence: seed.estimated_success_chance,
        error: Some(reason.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn candidate(source: &str, chance: u8) -> SolutionCandidate {
        SolutionCandidate {
            source: source.to_string(),
            code: format!("// from {source}\n"),
            description: String::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            estimated_success_chance: chance,
        }
    }

    #[test]
    fn test_seed_is_highest_chance() {
        let candidates = [candidate("a", 6), candidate("b", 9), candidate("c", 7)];
        assert_eq!(select_seed(&candidates).unwrap().source, "b");
    }

    #[test]
    fn test_seed_tie_goes_to_first() {
        let candidates = [candidate("a", 5), candidate("b", 8), candidate("c", 8)];
        assert_eq!(select_seed(&candidates).unwrap().source, "b");
    }

    #[test]
    fn test_seed_of_nothing() {
        assert!(select_seed(&[]).is_none());
    }

    #[test]
    fn test_prompt_embeds_seed_and_feedback() {
        let context = ProblemContext::new("Events are dropped");
        let validations = [ValidationRecord {
            backend: "qwen".to_string(),
            critique: "Candidate 1 misses a null check".to_string(),
            ratings: BTreeMap::from([(1, 6)]),
        }];

        let prompt = synthesis_prompt(&context, &candidate("arcee", 7), &validations);

        assert!(prompt.contains("BEST CANDIDATE (arcee):\n```\n// from arcee\n```"));
        assert!(prompt.contains("\"critique\": \"Candidate 1 misses a null check\""));
        assert!(prompt.contains("Events are dropped"));
    }

    #[test]
    fn test_outcome_takes_code_and_seed_fields() {
        let outcome = synthesis_outcome(
            &candidate("arcee", 7),
            "Final version below.\n```objc\nfinal();\n```",
        );
        assert_eq!(outcome.final_code, "final();\n");
        assert_eq!(outcome.explanation, "Final version below.\nfinal();");
        assert_eq!(outcome.recommended_candidate, "arcee");
        assert_eq!(outcome.success_confidence, 7);
        assert_eq!(outcome.error, None);
    }

    #[test]
    fn test_failure_keeps_seed_fields() {
        let outcome = synthesis_failure(&candidate("qwen", 8), "backend timed out");
        assert!(outcome.final_code.is_empty());
        assert!(outcome.explanation.is_empty());
        assert_eq!(outcome.recommended_candidate, "qwen");
        assert_eq!(outcome.success_confidence, 8);
        assert_eq!(outcome.error.as_deref(), Some("backend timed out"));
    }
}

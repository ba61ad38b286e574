//! Console progress output for `conclave analyze`

use crate::{PhasePayload, PhaseReport, PhaseSink};

/// Prints progress lines to stdout as each phase completes
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl PhaseSink for ConsoleSink {
    fn publish(&self, report: &PhaseReport) {
        for line in progress_lines(report) {
            println!("{line}");
        }
    }
}

/// Lines such as `[Phase 1] deepseek: confidence=7, code=true`.
pub fn progress_lines(report: &PhaseReport) -> Vec<String> {
    let tag = match report.phase.number() {
        Some(n) => format!("[Phase {n}]"),
        None => format!("[{}]", report.phase),
    };

    let mut lines = Vec::new();
    match &report.payload {
        PhasePayload::Analysis(outcome) => {
            for result in &outcome.results {
                lines.push(format!(
                    "{tag} {}: confidence={}, code={}",
                    result.backend, result.confidence, result.code_provided
                ));
            }
            let consensus = &outcome.consensus;
            lines.push(format!(
                "{tag} consensus: {} (avg confidence {:.1} over {} analyses)",
                consensus.most_common_approach,
                consensus.average_confidence,
                consensus.total_analyses
            ));
        }
        PhasePayload::Candidates(candidates) => {
            for candidate in candidates {
                lines.push(format!(
                    "{tag} {}: success={}/10, code={} chars",
                    candidate.source,
                    candidate.estimated_success_chance,
                    candidate.code.len()
                ));
            }
            if candidates.is_empty() {
                lines.push(format!("{tag} no candidates generated"));
            }
        }
        PhasePayload::Validation(outcome) => {
            for validation in &outcome.validations {
                lines.push(format!(
                    "{tag} {}: rated {} candidates",
                    validation.backend,
                    validation.ratings.len()
                ));
            }
            if let Some(top) = outcome.aggregated_ratings.first() {
                lines.push(format!(
                    "{tag} top: candidate {} ({}) {:.1}/10 from {} votes",
                    top.candidate, top.source, top.average_rating, top.num_votes
                ));
            }
        }
        PhasePayload::Synthesis(outcome) => {
            if let Some(reason) = &outcome.error {
                lines.push(format!("{tag} synthesis failed: {reason}"));
            }
            lines.push(format!(
                "{tag} recommended {}, confidence {}/10",
                outcome.recommended_candidate, outcome.success_confidence
            ));
        }
    }
    lines
}

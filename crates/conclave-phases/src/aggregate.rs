//! Reductions over phase results
//!
//! Both folds are pure. Inputs arrive in registry order, which is what
//! makes the first-wins tie-breaks below deterministic.

use conclave_extraction::Approach;
use conclave_phase_api::{
    AggregatedRating, AnalysisResult, Consensus, SolutionCandidate, ValidationRecord,
};

/// Insights kept in a consensus.
pub const MAX_SHARED_INSIGHTS: usize = 5;

/// Summarize agreement across analyses.
///
/// The most common approach is the one with the largest summed confidence;
/// on a tie the approach seen first wins. An empty input yields the
/// default consensus (`unknown`, 0.0, no insights).
#[must_use]
pub fn find_consensus(results: &[AnalysisResult]) -> Consensus {
    if results.is_empty() {
        return Consensus::default();
    }

    let mut weights: Vec<(Approach, u32)> = Vec::new();
    for result in results {
        let weight = u32::from(result.confidence);
        match weights.iter_mut().find(|(approach, _)| *approach == result.approach) {
            Some((_, total)) => *total += weight,
            None => weights.push((result.approach, weight)),
        }
    }

    let mut most_common = Approach::Unknown;
    let mut best: Option<u32> = None;
    for (approach, total) in &weights {
        if best.is_none_or(|b| *total > b) {
            best = Some(*total);
            most_common = *approach;
        }
    }

    let confidence_sum: u32 = results.iter().map(|r| u32::from(r.confidence)).sum();
    let average_confidence = f64::from(confidence_sum) / results.len() as f64;

    let mut shared_insights: Vec<String> = Vec::new();
    for insight in results.iter().flat_map(|r| &r.key_insights) {
        if shared_insights.len() == MAX_SHARED_INSIGHTS {
            break;
        }
        if !shared_insights.contains(insight) {
            shared_insights.push(insight.clone());
        }
    }

    Consensus {
        most_common_approach: most_common,
        average_confidence,
        shared_insights,
        total_analyses: results.len(),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Average validator ratings per candidate, best first.
///
/// A candidate no validator rated falls back to its own estimated success
/// chance with zero votes. The sort is stable, so equal averages keep
/// candidate order.
#[must_use]
pub fn aggregate_ratings(
    validations: &[ValidationRecord],
    candidates: &[SolutionCandidate],
) -> Vec<AggregatedRating> {
    let mut aggregated: Vec<AggregatedRating> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let ordinal = index + 1;
            let votes: Vec<u32> = validations
                .iter()
                .filter_map(|v| v.ratings.get(&ordinal).copied())
                .collect();

            let average = if votes.is_empty() {
                f64::from(candidate.estimated_success_chance)
            } else {
                let total: u64 = votes.iter().map(|&r| u64::from(r)).sum();
                total as f64 / votes.len() as f64
            };

            AggregatedRating {
                candidate: ordinal,
                source: candidate.source.clone(),
                average_rating: round_one_decimal(average),
                num_votes: votes.len(),
            }
        })
        .collect();

    aggregated.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating));
    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn analysis(
        backend: &str,
        approach: Approach,
        confidence: u8,
        insights: &[&str],
    ) -> AnalysisResult {
        AnalysisResult {
            backend: backend.to_string(),
            approach,
            confidence,
            code_provided: false,
            key_insights: insights.iter().map(|s| s.to_string()).collect(),
            potential_issues: Vec::new(),
            raw_response: String::new(),
        }
    }

    fn candidate(source: &str, chance: u8) -> SolutionCandidate {
        SolutionCandidate {
            source: source.to_string(),
            code: String::new(),
            description: String::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            estimated_success_chance: chance,
        }
    }

    fn validation(backend: &str, ratings: &[(usize, u32)]) -> ValidationRecord {
        ValidationRecord {
            backend: backend.to_string(),
            critique: String::new(),
            ratings: ratings.iter().copied().collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_average_confidence() {
        let consensus = find_consensus(&[
            analysis("a", Approach::QueueFix, 8, &[]),
            analysis("b", Approach::QueueFix, 6, &[]),
            analysis("c", Approach::DispatchFix, 7, &[]),
        ]);
        assert_eq!(consensus.average_confidence, 7.0);
        assert_eq!(consensus.most_common_approach, Approach::QueueFix);
        assert_eq!(consensus.total_analyses, 3);
    }

    #[test]
    fn test_approach_weighted_by_confidence() {
        let consensus = find_consensus(&[
            analysis("a", Approach::QueueFix, 2, &[]),
            analysis("b", Approach::QueueFix, 2, &[]),
            analysis("c", Approach::SenderIdFix, 9, &[]),
        ]);
        assert_eq!(consensus.most_common_approach, Approach::SenderIdFix);
    }

    #[test]
    fn test_approach_tie_goes_to_first_seen() {
        let consensus = find_consensus(&[
            analysis("a", Approach::DispatchFix, 6, &[]),
            analysis("b", Approach::QueueFix, 6, &[]),
        ]);
        assert_eq!(consensus.most_common_approach, Approach::DispatchFix);
    }

    #[test]
    fn test_empty_consensus() {
        let consensus = find_consensus(&[]);
        assert_eq!(consensus, Consensus::default());
    }

    #[test]
    fn test_shared_insights_deduplicated_and_capped() {
        let consensus = find_consensus(&[
            analysis("a", Approach::Unknown, 5, &["one", "two", "three"]),
            analysis("b", Approach::Unknown, 5, &["two", "four", "five", "six", "seven"]),
        ]);
        assert_eq!(
            consensus.shared_insights,
            vec!["one", "two", "three", "four", "five"]
        );
    }

    #[test]
    fn test_aggregate_averages_and_falls_back() {
        let candidates = [candidate("a", 4), candidate("b", 6), candidate("c", 9)];
        let validations = [
            validation("x", &[(1, 7), (2, 8)]),
            validation("y", &[(1, 8)]),
        ];

        let ratings = aggregate_ratings(&validations, &candidates);

        assert_eq!(ratings.len(), 3);
        assert_eq!(ratings[0].candidate, 3);
        assert_eq!(ratings[0].average_rating, 9.0);
        assert_eq!(ratings[0].num_votes, 0);
        assert_eq!(ratings[1].candidate, 2);
        assert_eq!(ratings[1].average_rating, 8.0);
        assert_eq!(ratings[2].candidate, 1);
        assert_eq!(ratings[2].average_rating, 7.5);
        assert_eq!(ratings[2].num_votes, 2);
        assert_eq!(ratings[2].source, "a");
    }

    #[test]
    fn test_aggregate_rounds_to_one_decimal() {
        let candidates = [candidate("a", 5)];
        let validations = [
            validation("x", &[(1, 7)]),
            validation("y", &[(1, 7)]),
            validation("z", &[(1, 8)]),
        ];
        let ratings = aggregate_ratings(&validations, &candidates);
        assert_eq!(ratings[0].average_rating, 7.3);
    }

    #[test]
    fn test_aggregate_ties_keep_ordinal_order() {
        let candidates = [candidate("a", 5), candidate("b", 7), candidate("c", 5)];
        let ratings = aggregate_ratings(&[], &candidates);
        let order: Vec<usize> = ratings.iter().map(|r| r.candidate).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_ratings(&[], &[]).is_empty());
    }
}

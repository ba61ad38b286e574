//! Typed records produced by the pipeline phases

use conclave_extraction::Approach;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The problem the ensemble is asked to work on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemContext {
    pub summary: String,
    /// Ordered facts rendered under the summary
    #[serde(default)]
    pub details: Vec<ContextDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDetail {
    pub key: String,
    pub value: String,
}

impl ProblemContext {
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push(ContextDetail {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Summary first, then one `- key: value` line per detail.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.summary.trim().to_string();
        if !self.details.is_empty() {
            out.push_str("\n\n");
            let lines: Vec<String> = self
                .details
                .iter()
                .map(|d| format!("- {}: {}", d.key, d.value))
                .collect();
            out.push_str(&lines.join("\n"));
        }
        out
    }
}

/// One backend's reading of the problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub backend: String,
    pub approach: Approach,
    /// 1..=10
    pub confidence: u8,
    pub code_provided: bool,
    pub key_insights: Vec<String>,
    pub potential_issues: Vec<String>,
    pub raw_response: String,
}

/// Summary of agreement across a set of analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub most_common_approach: Approach,
    pub average_confidence: f64,
    pub shared_insights: Vec<String>,
    pub total_analyses: usize,
}

impl Default for Consensus {
    fn default() -> Self {
        Self {
            most_common_approach: Approach::Unknown,
            average_confidence: 0.0,
            shared_insights: Vec::new(),
            total_analyses: 0,
        }
    }
}

/// One backend's proposed solution. Identified by its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionCandidate {
    pub source: String,
    pub code: String,
    pub description: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    /// 1..=10
    pub estimated_success_chance: u8,
}

/// One backend's critique of the candidate set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub backend: String,
    pub critique: String,
    /// Candidate ordinal (1-based) to rating, only for candidates the critique named
    pub ratings: BTreeMap<usize, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRating {
    /// 1-based candidate ordinal
    pub candidate: usize,
    pub source: String,
    /// Rounded to one decimal place
    pub average_rating: f64,
    pub num_votes: usize,
}

/// Output of the Analyze phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub results: Vec<AnalysisResult>,
    pub consensus: Consensus,
}

/// Output of the CrossValidate phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub validations: Vec<ValidationRecord>,
    pub aggregated_ratings: Vec<AggregatedRating>,
}

/// Output of the Synthesize phase
///
/// When the synthesis call fails, `final_code` and `explanation` are empty
/// and `error` says why; the seed fields are still filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub final_code: String,
    pub explanation: String,
    pub recommended_candidate: String,
    pub success_confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

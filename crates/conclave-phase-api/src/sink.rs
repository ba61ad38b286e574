//! Publish boundary for per-phase results
//!
//! The pipeline hands each [`PhaseReport`] to a [`PhaseSink`] as soon as the
//! phase's reduction completes. Sinks observe; they cannot affect the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::PhaseId;
use crate::records::{AnalysisOutcome, SolutionCandidate, SynthesisOutcome, ValidationOutcome};

/// Typed result carried by a phase report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PhasePayload {
    Analysis(AnalysisOutcome),
    Candidates(Vec<SolutionCandidate>),
    Validation(ValidationOutcome),
    Synthesis(SynthesisOutcome),
}

/// One completed phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: PhaseId,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub payload: PhasePayload,
}

impl PhaseReport {
    #[must_use]
    pub fn new(phase: PhaseId, duration_ms: u64, payload: PhasePayload) -> Self {
        Self {
            phase,
            timestamp: Utc::now(),
            duration_ms,
            payload,
        }
    }
}

/// Receives phase reports as they complete
pub trait PhaseSink: Send + Sync {
    fn publish(&self, report: &PhaseReport);
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl PhaseSink for NoopSink {
    fn publish(&self, _report: &PhaseReport) {}
}

/// Logs one summary line per phase
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PhaseSink for TracingSink {
    fn publish(&self, report: &PhaseReport) {
        let phase = report.phase.as_str();
        match &report.payload {
            PhasePayload::Analysis(outcome) => info!(
                phase,
                duration_ms = report.duration_ms,
                analyses = outcome.results.len(),
                approach = %outcome.consensus.most_common_approach,
                average_confidence = outcome.consensus.average_confidence,
                "Phase published"
            ),
            PhasePayload::Candidates(candidates) => info!(
                phase,
                duration_ms = report.duration_ms,
                candidates = candidates.len(),
                "Phase published"
            ),
            PhasePayload::Validation(outcome) => info!(
                phase,
                duration_ms = report.duration_ms,
                validations = outcome.validations.len(),
                top_candidate = ?outcome.aggregated_ratings.first().map(|r| r.candidate),
                "Phase published"
            ),
            PhasePayload::Synthesis(outcome) => info!(
                phase,
                duration_ms = report.duration_ms,
                recommended = %outcome.recommended_candidate,
                success_confidence = outcome.success_confidence,
                final_code_chars = outcome.final_code.len(),
                synthesis_error = ?outcome.error,
                "Phase published"
            ),
        }
    }
}

/// Keeps every report in memory, for tests
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: std::sync::Mutex<Vec<PhaseReport>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<PhaseReport> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn phases(&self) -> Vec<PhaseId> {
        self.reports().iter().map(|r| r.phase).collect()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl PhaseSink for CollectingSink {
    fn publish(&self, report: &PhaseReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.clone());
        }
    }
}

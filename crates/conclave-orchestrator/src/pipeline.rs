//! Sequential execution of the four pipeline phases

use chrono::Utc;
use conclave_config::Config;
use conclave_ensemble::Ensemble;
use conclave_phase_api::{
    EnsemblePhase, PhaseId, PhasePayload, PhaseReport, PhaseSink, ProblemContext,
};
use conclave_phases::{AnalyzePhase, CrossValidatePhase, GenerateCandidatesPhase};
use conclave_error_redaction::redact_error_message;
use conclave_utils::error::{PipelineError, UserFriendlyError};
use conclave_utils::logging::{log_phase_complete, log_phase_error, log_phase_start, phase_span};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, debug, info};

use crate::record::RunRecord;
use crate::synthesize::{select_seed, synthesis_failure, synthesis_outcome, synthesis_prompt};

/// Run-level settings that are not per-request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Backend that performs the Synthesize phase
    pub synthesis_backend: String,
    /// Forwarded as the system prompt of every fan-out phase
    pub system_prompt: Option<String>,
    /// Pipeline-wide deadline, measured from the start of `run`
    pub run_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            synthesis_backend: conclave_config::DEFAULT_SYNTHESIS_BACKEND.to_string(),
            system_prompt: None,
            run_timeout: None,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            synthesis_backend: config.synthesis_backend().to_string(),
            system_prompt: config.pipeline.analysis_system_prompt.clone(),
            run_timeout: config.run_timeout(),
        }
    }
}

/// Drives one problem through Analyze, GenerateCandidates, CrossValidate
/// and Synthesize.
///
/// The ensemble is borrowed, never owned: construct it once at process
/// start and share it across runs.
pub struct Pipeline<'a> {
    ensemble: &'a Ensemble,
    settings: PipelineSettings,
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn advance(run_id: &str, from: PhaseId) -> PhaseId {
    let to = from.next().unwrap_or(PhaseId::Done);
    debug!(run_id = %run_id, from = %from, to = %to, "Phase transition");
    to
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(ensemble: &'a Ensemble, settings: PipelineSettings) -> Self {
        Self { ensemble, settings }
    }

    /// Execute every phase in order and return the run record.
    ///
    /// Phases whose fan-out gets no responses still produce empty results
    /// and the run continues. Each phase's report goes to `sink` as soon as
    /// its reduction completes. A failed synthesis call does not discard
    /// the run: the record comes back with empty `final_code` and
    /// `synthesis_error` set.
    ///
    /// # Errors
    ///
    /// `NoCandidatesAvailable` if candidate generation yields nothing; no
    /// synthesis call is made in that case.
    pub async fn run(
        &self,
        context: &ProblemContext,
        sink: &dyn PhaseSink,
    ) -> Result<RunRecord, PipelineError> {
        let timestamp = Utc::now();
        let run_id = timestamp.format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let deadline = self.settings.run_timeout.map(|t| Instant::now() + t);
        let mut state = PhaseId::Analyze;

        info!(
            run_id = %run_id,
            backends = self.ensemble.available_count(),
            synthesis_backend = %self.settings.synthesis_backend,
            "Starting pipeline run"
        );

        let (analysis, duration_ms) = self
            .fan_out(&run_id, &AnalyzePhase::new(), context, deadline)
            .await;
        sink.publish(&PhaseReport::new(
            state,
            duration_ms,
            PhasePayload::Analysis(analysis.clone()),
        ));
        state = advance(&run_id, state);

        let (candidates, duration_ms) = self
            .fan_out(
                &run_id,
                &GenerateCandidatesPhase::new(context),
                &analysis.consensus,
                deadline,
            )
            .await;
        sink.publish(&PhaseReport::new(
            state,
            duration_ms,
            PhasePayload::Candidates(candidates.clone()),
        ));

        let Some(seed) = select_seed(&candidates) else {
            let error = PipelineError::NoCandidatesAvailable;
            log_phase_error(
                &run_id,
                state.as_str(),
                &error.to_string(),
                u128::from(duration_ms),
            );
            return Err(error);
        };
        state = advance(&run_id, state);

        let (validation, duration_ms) = self
            .fan_out(
                &run_id,
                &CrossValidatePhase::new(context),
                candidates.as_slice(),
                deadline,
            )
            .await;
        sink.publish(&PhaseReport::new(
            state,
            duration_ms,
            PhasePayload::Validation(validation.clone()),
        ));
        state = advance(&run_id, state);

        let phase = state.as_str();
        let started = Instant::now();
        let prompt = synthesis_prompt(context, seed, &validation.validations);
        let response = async {
            log_phase_start(&run_id, phase, 1);
            self.ensemble
                .dispatch_one(&self.settings.synthesis_backend, &prompt, None, deadline)
                .await
        }
        .instrument(phase_span(&run_id, phase))
        .await;

        let synthesis = match response {
            Ok(response) => {
                log_phase_complete(&run_id, phase, 1, started.elapsed().as_millis());
                synthesis_outcome(seed, &response.content)
            }
            Err(e) => {
                let reason = redact_error_message(&e.user_message());
                log_phase_error(&run_id, phase, &reason, started.elapsed().as_millis());
                synthesis_failure(seed, reason)
            }
        };
        sink.publish(&PhaseReport::new(
            state,
            elapsed_ms(started),
            PhasePayload::Synthesis(synthesis.clone()),
        ));
        state = advance(&run_id, state);
        debug_assert_eq!(state, PhaseId::Done);

        info!(
            run_id = %run_id,
            recommended = %synthesis.recommended_candidate,
            success_confidence = synthesis.success_confidence,
            synthesized = synthesis.error.is_none(),
            "Pipeline run completed"
        );

        Ok(RunRecord {
            run_id,
            timestamp,
            context: context.clone(),
            analysis: analysis.results,
            consensus: analysis.consensus,
            candidates,
            validations: validation.validations,
            aggregated_ratings: validation.aggregated_ratings,
            final_code: synthesis.final_code,
            explanation: synthesis.explanation,
            recommended_candidate: synthesis.recommended_candidate,
            success_confidence: synthesis.success_confidence,
            synthesis_error: synthesis.error,
        })
    }

    /// Build the phase prompt, fan it out, and reduce what came back.
    async fn fan_out<P: EnsemblePhase>(
        &self,
        run_id: &str,
        phase: &P,
        input: &P::Input,
        deadline: Option<Instant>,
    ) -> (P::Output, u64) {
        let name = phase.id().as_str();
        let started = Instant::now();

        let responses = async {
            log_phase_start(run_id, name, self.ensemble.available_count());
            let prompt = phase.prompt(input);
            self.ensemble
                .dispatch_all(&prompt, self.settings.system_prompt.as_deref(), deadline)
                .await
        }
        .instrument(phase_span(run_id, name))
        .await;

        let output = phase.postprocess(input, &responses);
        log_phase_complete(run_id, name, responses.len(), started.elapsed().as_millis());
        (output, elapsed_ms(started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_ensemble::DispatchSettings;
    use conclave_ensemble::testing::ScriptedBackend;
    use conclave_extraction::Approach;
    use conclave_llm::{BackendDescriptor, LlmBackend, LlmError};
    use conclave_phase_api::CollectingSink;
    use std::sync::Arc;

    const ANALYSIS_A: &str = "The sender id is wrong. Confidence: 8\n- sender id must match the client";
    const ANALYSIS_B: &str = "Dispatch ordering problem. Confidence: 6\n- events need the main queue";
    const CANDIDATE_A: &str =
        "Reset the sender id.\n```c\nset_sender();\n```\nPros:\n- one line change\nSuccess: 6/10";
    const CANDIDATE_B: &str =
        "Dispatch on main.\n```c\ndispatch_main();\n```\nPros:\n- keeps ordering\nSuccess: 9/10";
    const CRITIQUE: &str = "Candidate 1: 5/10\nCandidate 2: 8/10";
    const SYNTHESIS: &str = "Combined fix.\n```c\nset_sender();\ndispatch_main();\n```";

    fn descriptor(name: &str) -> BackendDescriptor {
        BackendDescriptor::new(
            name,
            format!("{}_API_KEY", name.to_uppercase()),
            "http://localhost",
            format!("{name}-model"),
        )
    }

    fn ensemble(members: Vec<(&str, Option<Arc<ScriptedBackend>>)>) -> Ensemble {
        Ensemble::with_backends(
            members.into_iter().map(|(name, backend)| {
                (
                    descriptor(name),
                    backend.map(|b| b as Arc<dyn LlmBackend>),
                )
            }),
            DispatchSettings::default(),
        )
    }

    fn settings(synthesis_backend: &str) -> PipelineSettings {
        PipelineSettings {
            synthesis_backend: synthesis_backend.to_string(),
            ..PipelineSettings::default()
        }
    }

    #[tokio::test]
    async fn test_full_run_produces_record() {
        let arcee = Arc::new(
            ScriptedBackend::new("arcee-model")
                .reply(ANALYSIS_A)
                .reply(CANDIDATE_A)
                .reply(CRITIQUE),
        );
        let deepseek = Arc::new(
            ScriptedBackend::new("deepseek-model")
                .reply(ANALYSIS_B)
                .reply(CANDIDATE_B)
                .reply(CRITIQUE)
                .reply(SYNTHESIS),
        );
        let ensemble = ensemble(vec![
            ("arcee", Some(arcee.clone())),
            ("deepseek", Some(deepseek.clone())),
            ("qwen", None),
        ]);
        let sink = CollectingSink::new();

        let record = Pipeline::new(&ensemble, settings("deepseek"))
            .run(&ProblemContext::new("Touches do not register"), &sink)
            .await
            .unwrap();

        assert_eq!(record.analysis.len(), 2);
        assert_eq!(record.consensus.most_common_approach, Approach::SenderIdFix);
        assert_eq!(record.consensus.average_confidence, 7.0);
        assert_eq!(record.candidates.len(), 2);
        assert_eq!(record.validations.len(), 2);
        assert_eq!(record.aggregated_ratings[0].candidate, 2);
        assert_eq!(record.aggregated_ratings[0].average_rating, 8.0);
        assert_eq!(record.recommended_candidate, "deepseek");
        assert_eq!(record.success_confidence, 9);
        assert_eq!(record.final_code, "set_sender();\ndispatch_main();\n");
        assert_eq!(record.explanation, "Combined fix.\nset_sender();\ndispatch_main();");

        assert_eq!(
            sink.phases(),
            vec![
                PhaseId::Analyze,
                PhaseId::GenerateCandidates,
                PhaseId::CrossValidate,
                PhaseId::Synthesize,
            ]
        );
        assert_eq!(arcee.calls(), 3);
        assert_eq!(deepseek.calls(), 4);
        assert!(deepseek.prompts()[3].contains("BEST CANDIDATE (deepseek)"));
        assert_eq!(record.synthesis_error, None);
    }

    #[tokio::test]
    async fn test_no_candidates_stops_before_synthesis() {
        let deepseek = Arc::new(
            ScriptedBackend::new("deepseek-model")
                .reply(ANALYSIS_B)
                .fail(LlmError::ProviderOutage("503".to_string()))
                .reply(SYNTHESIS),
        );
        let ensemble = ensemble(vec![("deepseek", Some(deepseek.clone()))]);
        let sink = CollectingSink::new();

        let err = Pipeline::new(&ensemble, settings("deepseek"))
            .run(&ProblemContext::new("p"), &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoCandidatesAvailable));
        assert_eq!(deepseek.calls(), 2);
        assert_eq!(
            sink.phases(),
            vec![PhaseId::Analyze, PhaseId::GenerateCandidates]
        );
    }

    #[tokio::test]
    async fn test_no_credentialed_backends_fails_with_no_candidates() {
        let ensemble = ensemble(vec![("arcee", None), ("deepseek", None)]);
        let sink = CollectingSink::new();

        let err = Pipeline::new(&ensemble, settings("deepseek"))
            .run(&ProblemContext::new("p"), &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoCandidatesAvailable));
        let reports = sink.reports();
        match &reports[0].payload {
            PhasePayload::Analysis(outcome) => {
                assert!(outcome.results.is_empty());
                assert_eq!(outcome.consensus.most_common_approach, Approach::Unknown);
                assert_eq!(outcome.consensus.average_confidence, 0.0);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_analysis_does_not_abort() {
        let arcee = Arc::new(
            ScriptedBackend::new("arcee-model")
                .fail(LlmError::Transport("reset".to_string()))
                .reply(CANDIDATE_A)
                .fail(LlmError::Transport("reset".to_string()))
                .reply(SYNTHESIS),
        );
        let ensemble = ensemble(vec![("arcee", Some(arcee))]);

        let record = Pipeline::new(&ensemble, settings("arcee"))
            .run(&ProblemContext::new("p"), &CollectingSink::new())
            .await
            .unwrap();

        assert!(record.analysis.is_empty());
        assert_eq!(record.consensus.total_analyses, 0);
        assert!(record.validations.is_empty());
        assert_eq!(record.aggregated_ratings[0].average_rating, 6.0);
        assert_eq!(record.aggregated_ratings[0].num_votes, 0);
        assert_eq!(record.recommended_candidate, "arcee");
    }

    #[tokio::test]
    async fn test_unavailable_synthesis_backend_still_yields_record() {
        let arcee = Arc::new(
            ScriptedBackend::new("arcee-model")
                .reply(ANALYSIS_A)
                .reply(CANDIDATE_A)
                .reply(CRITIQUE),
        );
        let ensemble = ensemble(vec![("arcee", Some(arcee)), ("deepseek", None)]);
        let sink = CollectingSink::new();

        let record = Pipeline::new(&ensemble, settings("deepseek"))
            .run(&ProblemContext::new("p"), &sink)
            .await
            .unwrap();

        assert_eq!(record.analysis.len(), 1);
        assert_eq!(record.candidates.len(), 1);
        assert_eq!(record.validations.len(), 1);
        assert!(record.final_code.is_empty());
        assert!(record.explanation.is_empty());
        assert_eq!(record.recommended_candidate, "arcee");
        assert_eq!(record.success_confidence, 6);
        let reason = record.synthesis_error.as_deref().unwrap();
        assert!(reason.contains("DEEPSEEK_API_KEY"));
        assert!(matches!(
            record.synthesis_result(),
            Err(PipelineError::SynthesisIncomplete { .. })
        ));

        assert_eq!(sink.phases().last(), Some(&PhaseId::Synthesize));
        match &sink.reports()[3].payload {
            PhasePayload::Synthesis(outcome) => assert_eq!(outcome.error.as_deref(), Some(reason)),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_synthesis_call_keeps_earlier_phases() {
        let deepseek = Arc::new(
            ScriptedBackend::new("deepseek-model")
                .reply(ANALYSIS_B)
                .reply(CANDIDATE_B)
                .reply(CRITIQUE)
                .fail(LlmError::ProviderOutage("503 Service Unavailable".to_string())),
        );
        let ensemble = ensemble(vec![("deepseek", Some(deepseek.clone()))]);

        let record = Pipeline::new(&ensemble, settings("deepseek"))
            .run(&ProblemContext::new("p"), &CollectingSink::new())
            .await
            .unwrap();

        assert_eq!(deepseek.calls(), 4);
        assert_eq!(record.consensus.average_confidence, 6.0);
        assert_eq!(record.aggregated_ratings.len(), 1);
        assert!(record.final_code.is_empty());
        assert!(record.synthesis_error.as_deref().unwrap().contains("deepseek"));
    }

    #[tokio::test]
    async fn test_system_prompt_reaches_fan_out_only() {
        let deepseek = Arc::new(
            ScriptedBackend::new("deepseek-model")
                .reply(ANALYSIS_B)
                .reply(CANDIDATE_B)
                .reply(CRITIQUE)
                .reply(SYNTHESIS),
        );
        let ensemble = ensemble(vec![("deepseek", Some(deepseek.clone()))]);
        let settings = PipelineSettings {
            system_prompt: Some("You are a systems engineer".to_string()),
            ..settings("deepseek")
        };

        Pipeline::new(&ensemble, settings)
            .run(&ProblemContext::new("p"), &CollectingSink::new())
            .await
            .unwrap();

        let systems = deepseek.system_prompts();
        assert_eq!(systems.len(), 4);
        assert!(systems[..3]
            .iter()
            .all(|s| s.as_deref() == Some("You are a systems engineer")));
        assert_eq!(systems[3], None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_deadline_bounds_every_phase() {
        let slow = Arc::new(
            ScriptedBackend::new("slow-model")
                .reply(ANALYSIS_A)
                .reply(CANDIDATE_A)
                .with_delay(Duration::from_secs(40)),
        );
        let ensemble = ensemble(vec![("slow", Some(slow.clone()))]);
        let settings = PipelineSettings {
            run_timeout: Some(Duration::from_secs(60)),
            ..settings("slow")
        };

        let err = Pipeline::new(&ensemble, settings)
            .run(&ProblemContext::new("p"), &CollectingSink::new())
            .await
            .unwrap_err();

        // Analysis finishes at 40s; candidate generation is cut off at 60s.
        assert!(matches!(err, PipelineError::NoCandidatesAvailable));
        assert_eq!(slow.calls(), 2);
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::minimal_for_testing();
        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.synthesis_backend, "deepseek");
        assert_eq!(settings.run_timeout, None);
    }
}

//! End-to-end pipeline runs through the public facade
//!
//! The scripted tests swap real connectors for in-process backends; the
//! wiremock test drives the real chat-completions connector over HTTP.

use conclave::config::{BackendConfig, WireFormat};
use conclave::extraction::Approach;
use conclave::llm::{BackendRegistry, HttpClient, LlmBackend, LlmError, StaticCredentials};
use conclave::transcript::write_transcript;
use conclave::{
    Config, Ensemble, PhaseId, PhasePayload, Pipeline, PipelineSettings, ProblemContext, RunRecord,
};
use conclave_ensemble::DispatchSettings;
use conclave_ensemble::testing::ScriptedBackend;
use conclave_phase_api::CollectingSink;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn descriptor(name: &str) -> conclave::llm::BackendDescriptor {
    conclave::llm::BackendDescriptor::new(
        name,
        format!("{}_API_KEY", name.to_uppercase()),
        "http://localhost",
        format!("{name}-model"),
    )
}

fn scripted_ensemble(members: &[(&str, Option<&Arc<ScriptedBackend>>)]) -> Ensemble {
    Ensemble::with_backends(
        members.iter().map(|(name, backend)| {
            (
                descriptor(name),
                backend.map(|b| Arc::clone(b) as Arc<dyn LlmBackend>),
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

fn context() -> ProblemContext {
    ProblemContext::new("Synthetic touch events are ignored after the app resumes")
        .with_detail("platform", "iOS 17")
        .with_detail("entry point", "IOHIDEventSystemClientDispatchEvent")
}

#[tokio::test]
async fn three_backends_full_run() {
    let arcee = Arc::new(
        ScriptedBackend::new("arcee-model")
            .reply("Queue ordering is the culprit. Confidence: 8\n- the run loop must drain the queue first")
            .reply("```c\ndrain_queue();\n```\nPros:\n- deterministic ordering\nSuccess: 7/10")
            .reply("Candidate 1: 8/10\nCandidate 2: 6/10\nCandidate 3: 5/10"),
    );
    let deepseek = Arc::new(
        ScriptedBackend::new("deepseek-model")
            .reply("A queue flush is needed. Confidence: 6\n- the run loop must drain the queue first")
            .reply("```c\nflush();\n```\nCons:\n- adds a frame of latency\nSuccess: 9/10")
            .reply("Candidate 1: 9/10\nCandidate 2: 7/10")
            .reply("Merged fix below.\n```c\ndrain_queue();\nflush();\n```"),
    );
    let qwen = Arc::new(
        ScriptedBackend::new("qwen-model")
            .reply("Rewrite the sender id. Confidence: 7")
            .reply("```c\nset_sender_id();\n```\nSuccess: 4/10")
            .fail(LlmError::ProviderQuota("429".to_string())),
    );
    let ensemble = scripted_ensemble(&[
        ("arcee", Some(&arcee)),
        ("deepseek", Some(&deepseek)),
        ("qwen", Some(&qwen)),
        ("anthropic", None),
    ]);
    let sink = CollectingSink::new();

    let record = Pipeline::new(&ensemble, settings("deepseek"))
        .run(&context(), &sink)
        .await
        .unwrap();

    // Analyze: 8 + 6 for queue_fix outweighs 7 for sender_id_fix.
    assert_eq!(record.analysis.len(), 3);
    assert_eq!(record.consensus.average_confidence, 7.0);
    assert_eq!(record.consensus.most_common_approach, Approach::QueueFix);
    assert_eq!(
        record.consensus.shared_insights,
        vec!["the run loop must drain the queue first"]
    );

    // Candidates keep registry order.
    let sources: Vec<&str> = record.candidates.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, vec!["arcee", "deepseek", "qwen"]);

    // qwen's critique failed, so two validators remain.
    assert_eq!(record.validations.len(), 2);
    let order: Vec<(usize, f64, usize)> = record
        .aggregated_ratings
        .iter()
        .map(|r| (r.candidate, r.average_rating, r.num_votes))
        .collect();
    assert_eq!(order, vec![(1, 8.5, 2), (2, 6.5, 2), (3, 5.0, 1)]);

    // The seed is the highest self-estimate, not the highest rating.
    assert_eq!(record.recommended_candidate, "deepseek");
    assert_eq!(record.success_confidence, 9);
    assert_eq!(record.final_code, "drain_queue();\nflush();\n");

    assert_eq!(
        sink.phases(),
        vec![
            PhaseId::Analyze,
            PhaseId::GenerateCandidates,
            PhaseId::CrossValidate,
            PhaseId::Synthesize,
        ]
    );
    assert!(arcee.prompts()[0].contains("- entry point: IOHIDEventSystemClientDispatchEvent"));
}

#[tokio::test]
async fn zero_credentialed_backends_reports_unknown_consensus() {
    let ensemble = scripted_ensemble(&[("arcee", None), ("deepseek", None)]);
    let sink = CollectingSink::new();

    let err = Pipeline::new(&ensemble, settings("deepseek"))
        .run(&context(), &sink)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        conclave::error::PipelineError::NoCandidatesAvailable
    ));
    let conclave_error = conclave::ConclaveError::from(err);
    assert_eq!(conclave_error.to_exit_code(), conclave::ExitCode::NO_CANDIDATES);

    let reports = sink.reports();
    assert_eq!(reports.len(), 2);
    match &reports[0].payload {
        PhasePayload::Analysis(outcome) => {
            assert_eq!(outcome.consensus.most_common_approach, Approach::Unknown);
            assert_eq!(outcome.consensus.average_confidence, 0.0);
            assert_eq!(outcome.consensus.total_analyses, 0);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn transcript_round_trips_run_record() {
    let solo = Arc::new(
        ScriptedBackend::new("solo-model")
            .reply("Confidence: 6")
            .reply("```sh\nrestart\n```\nSuccess: 6/10")
            .reply("Candidate 1: 7/10")
            .reply("```sh\nrestart --clean\n```"),
    );
    let ensemble = scripted_ensemble(&[("solo", Some(&solo))]);

    let record = Pipeline::new(&ensemble, settings("solo"))
        .run(&context(), &CollectingSink::new())
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = write_transcript(&record, dir.path()).unwrap();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap();
    assert!(name.starts_with("analysis_") && name.ends_with(".json"));

    let parsed: RunRecord = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, record);
    assert_eq!(parsed.final_code, "restart --clean\n");
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn http_backend_full_run() {
    let server = MockServer::start().await;
    let phases = [
        ("Analyze this technical problem:", "Use a dispatch barrier. Confidence: 9", 1),
        (
            "Generate a COMPLETE, WORKING solution",
            "```swift\nDispatchQueue.main.async(flags: .barrier) {}\n```\nSuccess: 8/10",
            1,
        ),
        ("Validate these candidate solutions", "Candidate 1: 7/10", 1),
        (
            "Create the FINAL, OPTIMIZED solution",
            "```swift\nDispatchQueue.main.async {}\n```",
            1,
        ),
    ];
    for (marker, reply, calls) in phases {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains(marker))
            .respond_with(chat_reply(reply))
            .expect(calls)
            .mount(&server)
            .await;
    }

    let config = Config::builder()
        .backend(BackendConfig {
            name: "local".to_string(),
            credential_env: "LOCAL_API_KEY".to_string(),
            endpoint: format!("{}/v1", server.uri()),
            model: "local-model".to_string(),
            wire: WireFormat::ChatCompletions,
            fallback: None,
        })
        .synthesis_backend("local")
        .call_timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let credentials = StaticCredentials::new().with("LOCAL_API_KEY", "test-key");
    let ensemble = Ensemble::new(
        &BackendRegistry::from_config(&config),
        &credentials,
        &Arc::new(HttpClient::new().unwrap()),
        DispatchSettings::from_config(&config),
    );

    let record = Pipeline::new(&ensemble, PipelineSettings::from_config(&config))
        .run(&context(), &CollectingSink::new())
        .await
        .unwrap();

    assert_eq!(record.analysis[0].approach, Approach::DispatchFix);
    assert_eq!(record.analysis[0].confidence, 9);
    assert_eq!(record.candidates[0].estimated_success_chance, 8);
    assert_eq!(record.aggregated_ratings[0].average_rating, 7.0);
    assert_eq!(record.final_code, "DispatchQueue.main.async {}\n");
    assert_eq!(record.recommended_candidate, "local");
}

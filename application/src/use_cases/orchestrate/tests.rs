use super::*;
use crate::ports::bench_policy::BenchAfterFailures;
use crate::ports::conversation_logger::MemoryConversationLogger;
use crate::ports::model_backend::{BackendError, ModelCapabilities};
use crate::ports::transport::{Topic, TransportError};
use async_trait::async_trait;
use hypoloop_domain::{
    Fact, Hypothesis, HypothesisState, LlmMessage, OrchestratorSnapshot, ReasonedBoolean,
    TeamMember, Test, TestState,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

// ==================== Test Mocks ====================

struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<LlmMessage>>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, reply: String) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BackendError::Other("No more replies".to_string()))
    }

    fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities::text_only()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Start(usize),
    Reset(String),
    Request(String),
    Publish(Topic, String),
    Terminate(String),
}

#[derive(Default)]
struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
}

impl RecordingTransport {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn requests(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Request(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn terminations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Terminate(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl GroupTransport for RecordingTransport {
    async fn start(&self, messages: &[ChatMessage]) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Start(messages.len()));
        Ok(())
    }

    async fn reset(&self, participant: &str) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Reset(participant.to_string()));
        Ok(())
    }

    async fn request_response(&self, participant: &str) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Request(participant.to_string()));
        Ok(())
    }

    async fn publish(&self, topic: Topic, message: &ChatMessage) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Publish(topic, message.content_text()));
        Ok(())
    }

    async fn terminate(&self, reason: &str) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Terminate(reason.to_string()));
        Ok(())
    }
}

// ==================== Scripted Replies ====================

fn reply(value: Value) -> String {
    format!(
        "Let me think this through.\n\n```json\n{}\n```",
        serde_json::to_string_pretty(&value).unwrap()
    )
}

fn reply_of<T: Serialize>(value: &T) -> String {
    reply(serde_json::to_value(value).unwrap())
}

fn fact_sheet_reply() -> String {
    reply(json!({
        "facts": [{"content": "The expression is (33+22)*(2+3)", "source": "question"}]
    }))
}

fn math_plan() -> Plan {
    Plan::new(vec![Hypothesis::new(
        "(33+22)*(2+3) equals 275",
        vec![
            Test::new("left-sum", "Compute 33 + 22").with_member(
                "Adder",
                "Add 33 and 22",
                "Adder adds integers",
            ),
            Test::new("right-sum", "Compute 2 + 3").with_member(
                "Adder",
                "Add 2 and 3",
                "Adder adds integers",
            ),
            Test::new("product", "Multiply the sums").with_member(
                "Multiplier",
                "Multiply 55 by 5",
                "Multiplier multiplies integers",
            ),
        ],
    )])
}

fn speaker_reply(name: Option<&str>, instruction: &str) -> String {
    reply(json!({
        "next_speaker": {"reason": "best suited for the current test", "answer": name},
        "instruction_or_question": {"reason": "next step of the test", "answer": instruction}
    }))
}

fn ledger_reply(test: Test, satisfied: bool, progress: bool, new_facts: Vec<Fact>) -> String {
    reply_of(&ProgressLedger {
        is_request_satisfied: ReasonedBoolean::new(
            satisfied,
            if satisfied { "275 was computed" } else { "work remains" },
        ),
        is_in_loop: ReasonedBoolean::new(false, "no repetition"),
        is_progress_being_made: ReasonedBoolean::new(progress, "judged from the last reply"),
        new_facts,
        current_test: test,
    })
}

fn final_reply(result: &str, complete: bool) -> String {
    reply(json!({
        "result": result,
        "completed_by_team_members": complete,
        "status": if complete { "complete" } else { "incomplete" },
        "failure_reason": if complete { Value::Null } else { json!("the team could not finish") }
    }))
}

fn roster() -> Roster {
    Roster::new(vec![
        TeamMember::new("Adder", "Adds two integers."),
        TeamMember::new("Multiplier", "Multiplies two integers."),
    ])
    .unwrap()
}

fn setup(replies: Vec<String>) -> (Orchestrator, Arc<ScriptedBackend>, Arc<RecordingTransport>) {
    let backend = Arc::new(ScriptedBackend::new(replies));
    let transport = Arc::new(RecordingTransport::default());
    let orchestrator = Orchestrator::new(roster(), backend.clone(), transport.clone());
    (orchestrator, backend, transport)
}

fn question() -> Vec<ChatMessage> {
    vec![ChatMessage::text("user", "What is (33+22)*(2+3)?")]
}

fn completed(index: usize, result: &str) -> Test {
    math_plan().hypotheses[0].tests[index]
        .clone()
        .with_state(TestState::Complete)
        .with_result(result)
}

// ==================== Scenarios ====================

#[tokio::test]
async fn test_simple_math_reaches_final_answer() {
    let (mut orchestrator, backend, transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);

    let phase = orchestrator.handle_start(question()).await.unwrap();
    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Adder".into()));
    assert_eq!(orchestrator.question(), Some("What is (33+22)*(2+3)?"));
    assert_eq!(orchestrator.total_turns(), 1);

    backend.push(ledger_reply(
        completed(0, "55"),
        false,
        true,
        vec![Fact::from_test("33 + 22 = 55", "left-sum")],
    ));
    backend.push(speaker_reply(Some("Adder"), "Add 2 and 3"));
    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "33 + 22 = 55"))
        .await
        .unwrap();
    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Adder".into()));
    assert_eq!(orchestrator.fact_sheet().unwrap().len(), 2);

    backend.push(ledger_reply(completed(1, "5"), false, true, vec![]));
    backend.push(speaker_reply(Some("Multiplier"), "Multiply 55 by 5"));
    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "2 + 3 = 5"))
        .await
        .unwrap();
    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Multiplier".into()));

    backend.push(ledger_reply(completed(2, "275"), true, true, vec![]));
    backend.push(final_reply("(33+22)*(2+3) = 275", true));
    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Multiplier", "55 * 5 = 275"))
        .await
        .unwrap();

    assert_eq!(phase, OrchestratorPhase::Terminated("275 was computed".into()));
    let answer = orchestrator.final_answer().unwrap();
    assert!(answer.result.contains("275"));
    assert!(answer.is_complete());

    assert_eq!(backend.calls(), 9);
    assert_eq!(backend.remaining(), 0);
    assert_eq!(transport.requests(), vec!["Adder", "Adder", "Multiplier"]);
    assert_eq!(transport.terminations(), vec!["275 was computed"]);
    assert_eq!(transport.calls()[0], Call::Start(1));

    let hypothesis = &orchestrator.plan().unwrap().hypotheses[0];
    assert!(hypothesis.tests[..2].iter().all(|t| t.state == TestState::Complete));
}

#[tokio::test]
async fn test_transcript_records_each_step() {
    let (orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    let logger = Arc::new(MemoryConversationLogger::new());
    let mut orchestrator = orchestrator.with_conversation_logger(logger.clone());
    orchestrator.handle_start(question()).await.unwrap();

    backend.push(ledger_reply(completed(0, "55"), false, true, vec![]));
    backend.push(speaker_reply(Some("Adder"), "Add 2 and 3"));
    orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "33 + 22 = 55"))
        .await
        .unwrap();

    let steps: Vec<&str> = logger
        .event_types()
        .into_iter()
        .filter(|t| {
            matches!(
                *t,
                "run_started" | "plan_created" | "speaker_selected" | "agent_response"
                    | "progress_ledger"
            )
        })
        .collect();
    assert_eq!(
        steps,
        vec![
            "run_started",
            "plan_created",
            "speaker_selected",
            "agent_response",
            "progress_ledger",
            "speaker_selected",
        ]
    );

    let started = &logger.events()[0];
    assert_eq!(started.event_type, "run_started");
    assert_eq!(started.payload["team"], json!(["Adder", "Multiplier"]));
}

#[tokio::test]
async fn test_failing_participant_stalls_then_replans() {
    let params = OrchestrationParams::default()
        .with_max_stalls(3)
        .with_max_turns_per_test(None)
        .with_max_turns_per_hypothesis(None);
    let (orchestrator, backend, transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    let mut orchestrator = orchestrator.with_params(params);
    orchestrator.handle_start(question()).await.unwrap();

    let open_test = math_plan().hypotheses[0].tests[0].clone();
    for stall in 1..=2 {
        backend.push(ledger_reply(open_test.clone(), false, false, vec![]));
        backend.push(speaker_reply(Some("Adder"), "Please try again"));
        orchestrator
            .handle_agent_response(ChatMessage::text("Adder", "Error: add tool failed"))
            .await
            .unwrap();
        assert_eq!(orchestrator.stall_count(), stall);
    }

    // Third stall triggers the replan; the new plan benches the Adder
    let mut replanned = math_plan();
    replanned.bench("Adder");
    backend.push(ledger_reply(open_test.clone(), false, false, vec![]));
    backend.push(reply_of(&replanned));
    backend.push(speaker_reply(None, ""));
    backend.push(final_reply("Could not compute the sums", false));

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "Error: add tool failed"))
        .await
        .unwrap();

    assert!(matches!(phase, OrchestratorPhase::Terminated(ref r) if r.starts_with("no viable speaker")));
    assert!(orchestrator.plan().unwrap().is_benched("Adder"));
    // Counters restart with the new hypothesis pass
    assert_eq!(orchestrator.stall_count(), 0);
    assert!(orchestrator.total_turns() <= orchestrator.params().max_turns_total.unwrap());
    assert!(!orchestrator.final_answer().unwrap().is_complete());
    assert_eq!(backend.remaining(), 0);
    assert!(transport.calls().contains(&Call::Reset("Adder".into())));
}

#[tokio::test]
async fn test_turn_ceiling_finalizes() {
    let (orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
        final_reply("Ran out of turns", false),
    ]);
    let mut orchestrator =
        orchestrator.with_params(OrchestrationParams::default().with_max_turns_total(Some(1)));

    orchestrator.handle_start(question()).await.unwrap();
    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "55"))
        .await
        .unwrap();

    assert_eq!(
        phase,
        OrchestratorPhase::Terminated("turn ceiling reached (1 turns)".into())
    );
    // No ledger was requested for the turn over the ceiling
    assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn test_all_members_benched_finalizes() {
    let mut plan = math_plan();
    plan.bench("Adder");
    plan.bench("Multiplier");
    let (mut orchestrator, _backend, transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&plan),
        final_reply("No one could work on the question", false),
    ]);

    let phase = orchestrator.handle_start(question()).await.unwrap();
    assert_eq!(
        phase,
        OrchestratorPhase::Terminated("all team members benched".into())
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_bench_policy_benches_failing_member() {
    let (orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    let mut orchestrator = orchestrator
        .with_bench_policy(Arc::new(BenchAfterFailures(1)))
        .with_params(OrchestrationParams::default().with_max_stalls(1));
    orchestrator.handle_start(question()).await.unwrap();

    orchestrator.record_participant_failure("Adder");
    let open_test = math_plan().hypotheses[0].tests[0].clone();
    backend.push(ledger_reply(open_test, false, false, vec![]));
    backend.push(reply_of(&math_plan()));
    backend.push(speaker_reply(Some("Multiplier"), "Can you add 33 and 22?"));

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "Error: add tool failed"))
        .await
        .unwrap();

    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Multiplier".into()));
    assert!(orchestrator.plan().unwrap().is_benched("Adder"));
}

#[tokio::test]
async fn test_finished_hypothesis_without_alternatives() {
    let plan = Plan::new(vec![Hypothesis::new(
        "(33+22)*(2+3) equals 275",
        vec![Test::new("only", "Compute it")],
    )]);
    let (mut orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&plan),
        speaker_reply(Some("Adder"), "Compute it"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();

    let abandoned = Test::new("only", "Compute it").with_state(TestState::Abandoned);
    let mut after_completion = plan.clone();
    after_completion.hypotheses[0].tests[0] = abandoned.clone();
    backend.push(ledger_reply(abandoned, false, false, vec![]));
    backend.push(reply_of(&after_completion));
    backend.push(final_reply("Unknown", false));

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "I cannot do that"))
        .await
        .unwrap();

    assert_eq!(
        phase,
        OrchestratorPhase::Terminated("no remaining hypotheses".into())
    );
    assert_eq!(
        orchestrator.plan().unwrap().hypotheses[0].state,
        HypothesisState::Unverifiable
    );
}

// ==================== Events ====================

#[tokio::test]
async fn test_second_start_is_rejected() {
    let (mut orchestrator, _backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();

    let err = orchestrator.handle_start(question()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidEvent(_)));
    assert_eq!(
        orchestrator.phase(),
        &OrchestratorPhase::AwaitingResponse("Adder".into())
    );
}

#[tokio::test]
async fn test_mismatched_response_is_ignored() {
    let (mut orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();
    let calls = backend.calls();
    let thread_len = orchestrator.thread().len();

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Multiplier", "I multiplied something"))
        .await
        .unwrap();

    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Adder".into()));
    assert_eq!(backend.calls(), calls);
    assert_eq!(orchestrator.thread().len(), thread_len);
}

#[tokio::test]
async fn test_response_while_idle_is_ignored() {
    let (mut orchestrator, backend, _transport) = setup(vec![]);
    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "55"))
        .await
        .unwrap();
    assert_eq!(phase, OrchestratorPhase::Idle);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_blank_speaker_is_retried_not_finalized() {
    let (mut orchestrator, backend, transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("   "), "Add 33 and 22"),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);

    let phase = orchestrator.handle_start(question()).await.unwrap();

    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Adder".into()));
    assert_eq!(backend.remaining(), 0);
    assert!(transport.terminations().is_empty());
    assert!(orchestrator.final_answer().is_none());
}

#[tokio::test]
async fn test_ledger_for_another_test_is_retried() {
    let (mut orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();

    let renamed = Test::new("sum-of-left", "Compute 33 + 22").with_state(TestState::Complete);
    backend.push(ledger_reply(renamed, false, true, vec![]));
    backend.push(ledger_reply(completed(0, "55"), false, true, vec![]));
    backend.push(speaker_reply(Some("Adder"), "Add 2 and 3"));

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "55"))
        .await
        .unwrap();

    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Adder".into()));
    assert_eq!(backend.remaining(), 0);
    let tests = &orchestrator.plan().unwrap().hypotheses[0].tests;
    assert_eq!(tests[0].state, TestState::Complete);
    assert!(tests.iter().all(|t| t.name != "sum-of-left"));
}

#[tokio::test]
async fn test_stale_ledger_cannot_reopen_finished_test() {
    let (mut orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();

    backend.push(ledger_reply(completed(0, "55"), false, true, vec![]));
    backend.push(speaker_reply(Some("Adder"), "Add 2 and 3"));
    orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "33 + 22 = 55"))
        .await
        .unwrap();

    // The model reports on left-sum again instead of the open right-sum
    let stale = math_plan().hypotheses[0].tests[0]
        .clone()
        .with_state(TestState::Abandoned);
    backend.push(ledger_reply(stale, false, false, vec![]));
    backend.push(ledger_reply(completed(1, "5"), false, true, vec![]));
    backend.push(speaker_reply(Some("Multiplier"), "Multiply 55 by 5"));

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "2 + 3 = 5"))
        .await
        .unwrap();

    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Multiplier".into()));
    let states: Vec<TestState> = orchestrator.plan().unwrap().hypotheses[0]
        .tests
        .iter()
        .map(|t| t.state)
        .collect();
    assert_eq!(
        states,
        vec![TestState::Complete, TestState::Complete, TestState::Incomplete]
    );
}

#[tokio::test]
async fn test_restored_plan_without_open_test_is_state_integrity_error() {
    let (mut orchestrator, _backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();

    let mut snapshot = orchestrator.save_state();
    if let Some(plan) = snapshot.plan.as_mut() {
        for test in &mut plan.hypotheses[0].tests {
            test.state = TestState::Complete;
        }
    }
    let (mut restored, backend, _transport) = setup(vec![]);
    restored.load_state(snapshot);

    let err = restored
        .handle_agent_response(ChatMessage::text("Adder", "55"))
        .await
        .unwrap_err();
    assert!(err.is_state_integrity());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_replan_with_finished_hypothesis_moves_past_it() {
    let plan = Plan::new(vec![
        Hypothesis::new(
            "33 + 22 is 55",
            vec![Test::new("left-sum", "Compute 33 + 22")],
        ),
        Hypothesis::new(
            "2 + 3 is 5",
            vec![Test::new("right-sum", "Compute 2 + 3")
                .with_state(TestState::Complete)
                .with_result("5")],
        ),
        Hypothesis::new(
            "55 * 5 is 275",
            vec![Test::new("product", "Multiply the sums")],
        ),
    ]);
    let (mut orchestrator, backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&plan),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();

    let left_sum = Test::new("left-sum", "Compute 33 + 22")
        .with_state(TestState::Complete)
        .with_result("55");
    let mut replanned = plan.clone();
    replanned.hypotheses[0].tests[0] = left_sum.clone();
    backend.push(ledger_reply(left_sum, false, true, vec![]));
    backend.push(reply_of(&replanned));
    backend.push(speaker_reply(Some("Multiplier"), "Multiply 55 by 5"));

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Adder", "33 + 22 = 55"))
        .await
        .unwrap();

    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Multiplier".into()));
    let states: Vec<HypothesisState> = orchestrator
        .plan()
        .unwrap()
        .hypotheses
        .iter()
        .map(|h| h.state)
        .collect();
    assert_eq!(
        states,
        vec![
            HypothesisState::Verified,
            HypothesisState::Verified,
            HypothesisState::Unverified
        ]
    );

    let product = Test::new("product", "Multiply the sums")
        .with_state(TestState::Complete)
        .with_result("275");
    backend.push(ledger_reply(product, true, true, vec![]));
    backend.push(final_reply("(33+22)*(2+3) = 275", true));

    let phase = orchestrator
        .handle_agent_response(ChatMessage::text("Multiplier", "55 * 5 = 275"))
        .await
        .unwrap();
    assert_eq!(phase, OrchestratorPhase::Terminated("275 was computed".into()));
}

#[tokio::test]
async fn test_cancelled_run_applies_nothing() {
    let token = CancellationToken::new();
    let (orchestrator, backend, _transport) = setup(vec![fact_sheet_reply()]);
    let mut orchestrator = orchestrator.with_cancellation(token.clone());
    token.cancel();

    let err = orchestrator.handle_start(question()).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(orchestrator.fact_sheet().is_none());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_reset_returns_to_idle() {
    let (mut orchestrator, _backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();
    orchestrator.record_participant_failure("Adder");

    orchestrator.reset();

    assert_eq!(orchestrator.phase(), &OrchestratorPhase::Idle);
    assert!(orchestrator.plan().is_none());
    assert!(orchestrator.thread().is_empty());
    assert_eq!(orchestrator.total_turns(), 0);
    assert_eq!(orchestrator.save_state(), OrchestratorSnapshot::default());
}

// ==================== Checkpoints ====================

#[tokio::test]
async fn test_save_load_save_is_identical() {
    let (mut orchestrator, _backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();
    let saved = orchestrator.save_state();

    let (mut restored, _, _) = setup(vec![]);
    restored.load_state(saved.clone());
    assert_eq!(restored.save_state(), saved);

    let json = saved.to_json().unwrap();
    let mut from_json = setup(vec![]).0;
    from_json.load_state(OrchestratorSnapshot::from_json(&json).unwrap());
    assert_eq!(from_json.save_state(), saved);
}

#[tokio::test]
async fn test_restored_orchestrator_continues() {
    let (mut orchestrator, _backend, _transport) = setup(vec![
        fact_sheet_reply(),
        reply_of(&math_plan()),
        speaker_reply(Some("Adder"), "Add 33 and 22"),
    ]);
    orchestrator.handle_start(question()).await.unwrap();
    let saved = orchestrator.save_state();

    let (mut restored, backend, transport) = setup(vec![
        ledger_reply(completed(0, "55"), false, true, vec![]),
        speaker_reply(Some("Adder"), "Add 2 and 3"),
    ]);
    restored.load_state(saved);

    let phase = restored
        .handle_agent_response(ChatMessage::text("Adder", "55"))
        .await
        .unwrap();
    assert_eq!(phase, OrchestratorPhase::AwaitingResponse("Adder".into()));
    assert_eq!(backend.calls(), 2);
    assert_eq!(transport.requests(), vec!["Adder"]);
    // Committing the test starts a fresh iteration for the next one
    assert_eq!(restored.total_turns(), 3);
}

mod common;

use common::*;
use duet_composite::{
    AnswerStage, Composite, CompositeError, CompositeEvent, ConfigurationError, Phase, PromptConfig, StreamChunk,
};
use duet_llm::{ChatTransport, Role, TransportError, TransportErrorKind, UsageStats};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn composite(reasoning: &Arc<ScriptedTransport>, answer: &Arc<ScriptedTransport>) -> Composite {
    Composite::builder()
        .reasoning(Arc::clone(reasoning) as Arc<dyn ChatTransport>, "deepseek-reasoner")
        .answer(Arc::clone(answer) as Arc<dyn ChatTransport>, "gemini-2.0-flash")
        .build()
        .unwrap()
}

fn completed(events: &[CompositeEvent]) -> &duet_composite::CompositeResult {
    match events.last() {
        Some(CompositeEvent::Completed(result)) => result,
        other => panic!("Expected Completed, got {:?}", other),
    }
}

fn failed(events: &[CompositeEvent]) -> &CompositeError {
    match events.last() {
        Some(CompositeEvent::Failed { error, .. }) => error,
        other => panic!("Expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_what_is_two_plus_two() {
    let reasoning = Arc::new(
        ScriptedTransport::new(vec![
            thought("The user asks 2+2. "),
            delta("2 plus 2 equals 4."),
            usage(10, 100, 110),
            done(),
        ])
        .with_delay(Duration::from_millis(2)),
    );
    let answer = Arc::new(ScriptedTransport::new(vec![delta("4"), usage(120, 1, 121), done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("What is 2+2?")).await;

    assert!(matches!(events.first(), Some(CompositeEvent::Started { run_id, .. }) if run_id.starts_with("run_")));
    let result = completed(&events);

    assert_eq!(result.reasoning.full_text, "The user asks 2+2. 2 plus 2 equals 4.");
    assert_eq!(result.answer.full_text, "4");
    assert!(result.total_elapsed > Duration::ZERO);
    assert!(result.total_elapsed >= result.reasoning.elapsed);

    let usage = result.usage();
    assert_eq!(usage.usage, UsageStats::new(130, 101, 231));
    assert!(usage.is_complete());

    // The answer model saw the question and the whole trace
    let requests = answer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gemini-2.0-flash");
    let prompt = &requests[0].messages.last().unwrap().content;
    assert!(prompt.contains("What is 2+2?"));
    assert!(prompt.contains("The user asks 2+2. 2 plus 2 equals 4."));
}

#[tokio::test]
async fn test_hel_lo_fixture() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![
        delta("Hel"),
        delta("lo"),
        usage(5, 2, 7),
        done(),
    ]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("ok"), done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("Say hello")).await;
    let reasoning_chunks: Vec<StreamChunk> = chunks(&events)
        .into_iter()
        .filter(|c| c.phase == Phase::Reasoning)
        .collect();

    assert_eq!(
        reasoning_chunks,
        vec![
            StreamChunk::delta(Phase::Reasoning, "Hel"),
            StreamChunk::delta(Phase::Reasoning, "lo"),
            StreamChunk::terminal(Phase::Reasoning),
        ]
    );

    let result = completed(&events);
    assert_eq!(result.reasoning.full_text, "Hello");
    assert_eq!(result.reasoning.usage, Some(UsageStats::new(5, 2, 7)));
}

#[tokio::test]
async fn test_delivered_text_matches_stage_results() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![
        delta("a"),
        thought("b"),
        delta(""),
        delta("c"),
        done(),
    ]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("x"), delta("yz"), done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("q")).await;
    let all = chunks(&events);
    let result = completed(&events);

    assert_eq!(text_of(&all, Phase::Reasoning), result.reasoning.full_text);
    assert_eq!(text_of(&all, Phase::Answer), result.answer.full_text);
    assert_eq!(result.answer.full_text, "xyz");
}

#[tokio::test]
async fn test_no_answer_chunk_before_reasoning_terminal() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("r1"), delta("r2"), done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a1"), delta("a2"), done()]));

    let all = chunks(&collect(composite(&reasoning, &answer).spawn_run("q")).await);

    let reasoning_terminal = all
        .iter()
        .position(|c| c.phase == Phase::Reasoning && c.is_final)
        .unwrap();
    let first_answer = all.iter().position(|c| c.phase == Phase::Answer).unwrap();

    assert!(reasoning_terminal < first_answer);
    assert!(all[..reasoning_terminal].iter().all(|c| c.phase == Phase::Reasoning));
    assert!(all[reasoning_terminal + 1..].iter().all(|c| c.phase == Phase::Answer));
    assert_eq!(all.iter().filter(|c| c.is_final).count(), 2);
    assert!(all.last().unwrap().is_final);
}

#[tokio::test]
async fn test_reasoning_failure_after_chunks() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![
        delta("step one, "),
        delta("step two, "),
        Err(TransportError::Connection("connection reset".to_string())),
        delta("never seen"),
    ]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("4"), done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("What is 2+2?")).await;
    let all = chunks(&events);

    assert_eq!(
        all,
        vec![
            StreamChunk::delta(Phase::Reasoning, "step one, "),
            StreamChunk::delta(Phase::Reasoning, "step two, "),
        ]
    );

    match failed(&events) {
        CompositeError::Stage(failure) => {
            assert_eq!(failure.phase, Phase::Reasoning);
            assert_eq!(failure.cause.kind(), TransportErrorKind::Connection);
        }
        other => panic!("Expected stage failure, got {:?}", other),
    }
    assert_eq!(answer.call_count(), 0);
}

#[tokio::test]
async fn test_answer_failure_is_attributed_to_answer() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("think"), done()]));
    let answer = Arc::new(ScriptedTransport::failing(TransportError::Protocol(
        "Gemini API error (400 Bad Request): API key not valid".to_string(),
    )));

    let events = collect(composite(&reasoning, &answer).spawn_run("q")).await;

    assert!(chunks(&events).contains(&StreamChunk::terminal(Phase::Reasoning)));
    let error = failed(&events);
    assert_eq!(error.phase(), Some(Phase::Answer));
    assert!(error.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn test_stream_without_done_is_incomplete() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("half a thou")]));
    let answer = Arc::new(ScriptedTransport::new(vec![done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("q")).await;

    match failed(&events) {
        CompositeError::Stage(failure) => {
            assert_eq!(failure.phase, Phase::Reasoning);
            assert_eq!(failure.cause.kind(), TransportErrorKind::IncompleteStream);
        }
        other => panic!("Expected stage failure, got {:?}", other),
    }
    assert!(!chunks(&events).iter().any(|c| c.is_final));
}

#[tokio::test]
async fn test_missing_answer_usage_is_reported() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("r"), usage(10, 100, 110), done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a"), done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("q")).await;
    let result = completed(&events);
    let aggregate = result.usage();

    assert_eq!(result.answer.usage, None);
    assert_eq!(aggregate.usage.total_tokens, 110);
    assert_eq!(aggregate.unavailable, vec![Phase::Answer]);
}

#[tokio::test]
async fn test_usage_after_done_is_not_committed() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("r"), done(), usage(1, 1, 2)]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a"), done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("q")).await;
    assert_eq!(completed(&events).reasoning.usage, None);
}

#[tokio::test]
async fn test_empty_reasoning_still_answers() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("4"), done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("What is 2+2?")).await;
    let result = completed(&events);

    assert_eq!(result.reasoning.full_text, "");
    assert_eq!(result.answer.full_text, "4");
    assert_eq!(
        chunks(&events)
            .into_iter()
            .filter(|c| c.phase == Phase::Reasoning)
            .collect::<Vec<_>>(),
        vec![StreamChunk::terminal(Phase::Reasoning)]
    );

    let requests = answer.requests();
    let prompt = &requests[0].messages.last().unwrap().content;
    assert!(prompt.contains("What is 2+2?"));
    assert!(!prompt.contains("{reasoning}"));
}

#[tokio::test]
async fn test_answer_model_reasoning_is_dropped() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("r"), done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![
        thought("internal musing"),
        delta("final"),
        done(),
    ]));

    let events = collect(composite(&reasoning, &answer).spawn_run("q")).await;

    assert_eq!(completed(&events).answer.full_text, "final");
    assert_eq!(text_of(&chunks(&events), Phase::Answer), "final");
}

#[tokio::test]
async fn test_empty_question_fails_before_network() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![done()]));

    let events = collect(composite(&reasoning, &answer).spawn_run("   ")).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(failed(&events), CompositeError::EmptyQuestion));
    assert_eq!(reasoning.call_count(), 0);
}

#[tokio::test]
async fn test_request_messages() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("r"), done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a"), done()]));
    let prompts = PromptConfig::default()
        .with_reasoning_instruction("")
        .with_answer_instruction("Be brief.")
        .with_answer_template("Q={question} R={reasoning}");

    let composite = Composite::builder()
        .reasoning(Arc::clone(&reasoning) as Arc<dyn ChatTransport>, "deepseek-reasoner")
        .answer(Arc::clone(&answer) as Arc<dyn ChatTransport>, "gemini-2.0-flash")
        .prompts(prompts)
        .build()
        .unwrap();

    collect(composite.spawn_run("{reasoning}?")).await;

    let reasoning_requests = reasoning.requests();
    let reasoning_messages = &reasoning_requests[0].messages;
    assert_eq!(reasoning_messages.len(), 1);
    assert_eq!(reasoning_messages[0].role, Role::User);
    assert_eq!(reasoning_messages[0].content, "{reasoning}?");

    let answer_requests = answer.requests();
    let answer_messages = &answer_requests[0].messages;
    assert_eq!(answer_messages[0].role, Role::System);
    assert_eq!(answer_messages[0].content, "Be brief.");
    assert_eq!(answer_messages[1].content, "Q={reasoning}? R=r");
}

#[tokio::test]
async fn test_execute_with_caller_channel() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("r"), done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a"), done()]));
    let composite = composite(&reasoning, &answer);

    let (tx, rx) = mpsc::channel(16);
    let result = composite.execute("q", &tx).await.unwrap();
    drop(tx);
    let events = collect(rx).await;

    assert_eq!(result.answer.full_text, "a");
    assert!(matches!(events[0], CompositeEvent::Started { .. }));
    // Started plus two chunks and one terminal per stage
    assert_eq!(events.len(), 5);
    assert!(!events.iter().any(CompositeEvent::is_terminal));
}

#[tokio::test]
async fn test_dropping_receiver_cancels_run() {
    let endless = Arc::new(EndlessTransport::new());
    let released = Arc::clone(&endless.released);
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a"), done()]));

    let composite = Composite::builder()
        .reasoning(endless as Arc<dyn ChatTransport>, "deepseek-reasoner")
        .answer(Arc::clone(&answer) as Arc<dyn ChatTransport>, "gemini-2.0-flash")
        .build()
        .unwrap();

    let mut rx = composite.spawn_run("q");
    assert!(matches!(rx.recv().await, Some(CompositeEvent::Started { .. })));
    assert!(matches!(rx.recv().await, Some(CompositeEvent::Chunk(_))));
    drop(rx);

    let mut waited = Duration::ZERO;
    while !released.load(Ordering::SeqCst) && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }

    assert!(released.load(Ordering::SeqCst));
    assert_eq!(answer.call_count(), 0);
}

#[tokio::test]
async fn test_dropping_receiver_releases_stalled_stream() {
    let stalled = Arc::new(StalledTransport::new());
    let released = Arc::clone(&stalled.released);
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a"), done()]));

    let composite = Composite::builder()
        .reasoning(stalled as Arc<dyn ChatTransport>, "deepseek-reasoner")
        .answer(Arc::clone(&answer) as Arc<dyn ChatTransport>, "gemini-2.0-flash")
        .build()
        .unwrap();

    let mut rx = composite.spawn_run("q");
    assert!(matches!(rx.recv().await, Some(CompositeEvent::Started { .. })));
    assert!(matches!(rx.recv().await, Some(CompositeEvent::Chunk(_))));
    drop(rx);

    let mut waited = Duration::ZERO;
    while !released.load(Ordering::SeqCst) && waited < Duration::from_millis(500) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }

    assert!(released.load(Ordering::SeqCst), "stalled stream still held after receiver drop");
    assert_eq!(answer.call_count(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("r"), done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("a"), done()]));
    let composite = composite(&reasoning, &answer);

    let (first, second) = tokio::join!(
        collect(composite.spawn_run("one")),
        collect(composite.spawn_run("two"))
    );

    assert_ne!(completed(&first).run_id, completed(&second).run_id);
    assert_eq!(reasoning.call_count(), 2);
}

#[test]
fn test_builder_requires_both_stages() {
    let answer = Arc::new(ScriptedTransport::new(vec![done()]));
    let err = Composite::builder()
        .answer(answer as Arc<dyn ChatTransport>, "gemini-2.0-flash")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::Missing(_)));
}

#[test]
fn test_builder_rejects_zero_capacity() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![done()]));
    let answer = Arc::new(ScriptedTransport::new(vec![done()]));
    let err = Composite::builder()
        .reasoning(reasoning as Arc<dyn ChatTransport>, "r")
        .answer(answer as Arc<dyn ChatTransport>, "a")
        .channel_capacity(0)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::Invalid { field: "channel_capacity", .. }));
}

#[tokio::test]
async fn test_check_connections() {
    let reasoning = Arc::new(ScriptedTransport::new(vec![delta("ok"), done()]));
    let answer = Arc::new(ScriptedTransport::failing(TransportError::Protocol(
        "OpenAI-compatible API error (401 Unauthorized): bad key".to_string(),
    )));

    let report = composite(&reasoning, &answer).check_connections().await;

    assert!(report.reasoning.is_ok());
    assert_eq!(report.answer.as_ref().unwrap_err().kind(), TransportErrorKind::Protocol);
    assert!(!report.is_ok());

    let requests = reasoning.requests();
    let check = &requests[0];
    assert_eq!(check.model, "deepseek-reasoner");
    assert_eq!(check.messages.len(), 1);
    assert_eq!(check.options.max_tokens, Some(5));
}

#[tokio::test]
async fn test_check_connection_on_empty_stream_fails() {
    let reasoning = Arc::new(ScriptedTransport::new(Vec::new()));
    let answer = Arc::new(ScriptedTransport::new(vec![delta("ok"), done()]));

    let report = composite(&reasoning, &answer).check_connections().await;

    assert_eq!(
        report.reasoning.as_ref().unwrap_err().kind(),
        TransportErrorKind::IncompleteStream
    );
    assert!(report.answer.is_ok());
    assert!(!report.is_ok());
}

#[tokio::test]
async fn test_answer_stage_rejects_blank_question() {
    let transport = Arc::new(ScriptedTransport::new(vec![delta("4"), done()]));
    let stage = AnswerStage::new(Arc::clone(&transport) as Arc<dyn ChatTransport>, "gemini-2.0-flash");
    let (tx, _rx) = mpsc::channel(4);

    let err = stage.produce("  \n", "some analysis", &tx).await.unwrap_err();

    assert!(matches!(err, CompositeError::EmptyQuestion));
    assert_eq!(transport.call_count(), 0);
}

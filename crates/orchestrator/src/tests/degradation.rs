//! Data-unavailable branch, total failure and panics.

use super::fakes::*;
use crate::memory::{Session, TurnMethod};
use crate::orchestrator::Collaborators;
use std::sync::Arc;

#[tokio::test]
async fn test_execution_failure_answers_from_documents() {
    let summarizer = Arc::new(FakeSummarizer::returning("unused"));
    let synthesizer = Arc::new(EchoSynthesizer::new());
    let orchestrator = orchestrator(Collaborators {
        runner: Arc::new(FakeRunner::failing("table missing")),
        summarizer: summarizer.clone(),
        synthesizer: synthesizer.clone(),
        ..healthy()
    });
    let mut session = Session::new();

    let answer = orchestrator.ask(&mut session, "Cases by state?", false).await;

    assert!(answer.contains("table missing"));
    assert_eq!(summarizer.calls(), 0);

    let context = synthesizer.contexts().pop().unwrap();
    assert!(context.starts_with("Note: Structured query failed with error: Execution error: table missing"));
    assert!(context.contains("Flu wave in São Paulo"));
    assert!(!context.contains("Records found"));
    assert_eq!(session.memory.turns()[0].method, TurnMethod::Manual);
}

#[tokio::test]
async fn test_execution_error_note_is_appended() {
    struct Terse;

    #[async_trait::async_trait]
    impl crate::synthesizer::AnswerSynthesizer for Terse {
        async fn synthesize(&self, _question: &str, _context: &str) -> epiqa_core::AppResult<String> {
            Ok("News suggests a flu wave.".to_string())
        }
    }

    let orchestrator = orchestrator(Collaborators {
        runner: Arc::new(FakeRunner::failing("table missing")),
        synthesizer: Arc::new(Terse),
        ..healthy()
    });
    let mut session = Session::new();

    let answer = orchestrator.ask(&mut session, "Cases?", false).await;
    assert!(answer.starts_with("News suggests a flu wave."));
    assert!(answer.contains("Note: structured data was unavailable (Execution error: table missing)."));
}

#[tokio::test]
async fn test_execution_failure_without_documents() {
    let synthesizer = Arc::new(EchoSynthesizer::new());
    let orchestrator = orchestrator(Collaborators {
        runner: Arc::new(FakeRunner::failing("table missing")),
        index: Arc::new(FakeIndex::returning(Vec::new())),
        synthesizer: synthesizer.clone(),
        ..healthy()
    });
    let mut session = Session::new();

    let answer = orchestrator.ask(&mut session, "Cases?", false).await;

    assert!(answer.starts_with(
        "Unable to access structured data: Execution error: table missing\nNo related news articles found.\n\nPlease rephrase your question"
    ));
    assert!(synthesizer.contexts().is_empty());
}

#[tokio::test]
async fn test_execution_and_search_failure() {
    let orchestrator = orchestrator(Collaborators {
        runner: Arc::new(FakeRunner::failing("table missing")),
        index: Arc::new(FakeIndex::failing("index corrupt")),
        ..healthy()
    });
    let mut session = Session::new();

    let answer = orchestrator.ask(&mut session, "Cases?", false).await;

    assert!(answer.starts_with("Multiple errors occurred:"));
    assert!(answer.contains("1. Structured data error: Execution error: table missing"));
    assert!(answer.contains("2. Document search error: Retrieval error: index corrupt"));
    assert!(answer.contains("• Query execution failed: Execution error: table missing"));
}

#[tokio::test]
async fn test_execution_and_synthesis_failure() {
    let orchestrator = orchestrator(Collaborators {
        runner: Arc::new(FakeRunner::failing("table missing")),
        synthesizer: Arc::new(EchoSynthesizer::failing("rate limited")),
        ..healthy()
    });
    let mut session = Session::new();

    let answer = orchestrator.ask(&mut session, "Cases?", false).await;

    assert!(answer.starts_with("Multiple errors occurred:"));
    assert!(answer.contains("1. Structured data error: Execution error: table missing"));
    assert!(answer.contains("2. Answer synthesis error: Generation error: rate limited"));
    assert!(answer.contains("\n\nCompleted steps:\n"));
    assert!(answer.contains("• Found 2 related documents"));
    assert!(answer.ends_with("• Answer synthesis failed: Generation error: rate limited"));
    assert!(!answer.contains("Workflow Steps:"));
}

#[tokio::test]
async fn test_document_answer_carries_trace() {
    let orchestrator = orchestrator(Collaborators {
        runner: Arc::new(FakeRunner::failing("table missing")),
        ..healthy()
    });
    let mut session = Session::new();

    let first = orchestrator.ask(&mut session, "Please explain the trend", false).await;
    assert!(!first.contains("Workflow Steps:"));

    let second = orchestrator.ask(&mut session, "Cases by state?", false).await;
    assert!(second.contains("\n\n---\nWorkflow Steps:\n• Generating structured query..."));
    assert!(second.contains("• Query execution failed: Execution error: table missing"));
    assert!(second.contains("• Searching related documents without structured data..."));
    assert!(second.contains("• Found 2 related documents"));
    assert!(second.ends_with("• Answer generated from document context"));

    let third = orchestrator.ask(&mut session, "Deaths in 2023?", false).await;
    assert!(!third.contains("Workflow Steps:"));
}

#[tokio::test]
async fn test_everything_failing_still_answers() {
    let orchestrator = orchestrator(broken());
    let mut session = Session::new();

    let questions = ["Cases?", "Please explain", "Deaths by state?"];
    for (i, question) in questions.iter().enumerate() {
        let manual = orchestrator.ask(&mut session, question, false).await;
        assert!(!manual.trim().is_empty());
        assert!(manual.contains("database down"));

        let delegated = orchestrator.ask(&mut session, question, true).await;
        assert!(delegated.starts_with("Error processing question: "));
        assert!(delegated.contains("agent down"));

        assert_eq!(session.memory.len(), (i + 1) * 2);
    }

    let counts = session.memory.counts();
    assert_eq!(counts.error, 3);
    assert_eq!(counts.manual, 3);
}

#[tokio::test]
async fn test_panicking_runner_is_contained() {
    let orchestrator = orchestrator(Collaborators {
        runner: Arc::new(PanickingRunner),
        ..healthy()
    });
    let mut session = Session::new();

    let answer = orchestrator.ask(&mut session, "Cases by state?", false).await;

    assert!(answer.starts_with("Error in explicit pipeline: Orchestration error: panic: driver crashed"));
    assert!(answer.contains("• Generating structured query..."));
    assert!(answer.contains("• Executing query on structured store..."));
    assert!(answer.ends_with("Original question: Cases by state?"));
    assert_eq!(session.memory.len(), 1);
    assert_eq!(session.memory.turns()[0].method, TurnMethod::Error);
}

#[tokio::test]
async fn test_session_usable_after_panic() {
    let panicking = orchestrator(Collaborators {
        runner: Arc::new(PanickingRunner),
        ..healthy()
    });
    let healthy_orchestrator = orchestrator(healthy());
    let mut session = Session::new();

    panicking.ask(&mut session, "first", false).await;
    let answer = healthy_orchestrator.ask(&mut session, "second", false).await;

    assert!(answer.starts_with("Answer to 'second'"));
    assert_eq!(session.memory.len(), 2);
    assert_eq!(session.memory.recent_context(3).len(), 1);
}

//! Strategy selection and the explicit five-stage pipeline.

use crate::agent::AgentRunner;
use crate::context::{dedupe_documents, format_documents, ContextBundle, NO_DOCUMENTS};
use crate::memory::{ConversationTurn, Session, TurnMethod};
use crate::policy::MetadataPolicy;
use crate::summarizer::{fallback_summary, ResultSummarizer, NO_DATA_SUMMARY};
use crate::synthesizer::AnswerSynthesizer;
use crate::text::preview;
use crate::trace::WorkflowTrace;
use crate::translator::QueryTranslator;
use epiqa_core::config::OrchestratorConfig;
use epiqa_core::{AppError, AppResult};
use epiqa_data::{ResultSet, SchemaCatalog, StructuredQueryRunner};
use epiqa_knowledge::{Document, DocumentIndex};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Documents retrieved per question.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

const QUERY_PREVIEW_CHARS: usize = 100;

/// The capabilities the orchestrator sequences.
#[derive(Clone)]
pub struct Collaborators {
    pub translator: Arc<dyn QueryTranslator>,
    pub runner: Arc<dyn StructuredQueryRunner>,
    pub summarizer: Arc<dyn ResultSummarizer>,
    pub index: Arc<dyn DocumentIndex>,
    pub synthesizer: Arc<dyn AnswerSynthesizer>,
    pub agent: Arc<dyn AgentRunner>,
}

/// Answers questions with either the delegated or the explicit strategy.
///
/// Shared across sessions; all per-conversation state lives in [`Session`].
pub struct Orchestrator {
    parts: Collaborators,
    schema: SchemaCatalog,
    policy: MetadataPolicy,
    context_turns: usize,
    dedupe: bool,
    search_limit: usize,
}

impl Orchestrator {
    pub fn new(parts: Collaborators, schema: SchemaCatalog, config: &OrchestratorConfig) -> Self {
        Self {
            parts,
            schema,
            policy: MetadataPolicy::new(config.metadata_keywords.iter().cloned()),
            context_turns: config.context_turns,
            dedupe: config.dedupe_documents,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Answer `question`, recording exactly one turn in `session`.
    ///
    /// Never fails: every error and panic is turned into answer text.
    #[tracing::instrument(skip(self, session), fields(session = %session.id))]
    pub async fn ask(&self, session: &mut Session, question: &str, use_agent: bool) -> String {
        let (answer, method) = if use_agent {
            self.ask_delegated(session, question).await
        } else {
            self.ask_explicit(session, question).await
        };

        let answer = if answer.trim().is_empty() {
            tracing::warn!("Strategy produced an empty answer");
            format!("No answer could be produced for: {}", question)
        } else {
            answer
        };

        session
            .memory
            .append(ConversationTurn::new(question, answer.clone(), method));
        tracing::info!(method = %method, turns = session.memory.len(), "Question answered");
        answer
    }

    async fn ask_delegated(&self, session: &Session, question: &str) -> (String, TurnMethod) {
        tracing::info!("Delegating question to agent");
        let outcome = AssertUnwindSafe(
            self.parts
                .agent
                .run_turn(question, session.memory.turns()),
        )
        .catch_unwind()
        .await;

        let error = match outcome {
            Ok(Ok(turn)) if !turn.answer.trim().is_empty() => {
                tracing::debug!(documents = turn.used_documents.len(), "Agent turn complete");
                return (turn.answer, TurnMethod::Agent);
            }
            Ok(Ok(_)) => AppError::Orchestration("agent returned an empty answer".to_string()),
            Ok(Err(e)) => e,
            Err(payload) => panic_error(payload),
        };

        tracing::warn!(error = %error, "Agent strategy failed");
        (
            format!("Error processing question: {}", error),
            TurnMethod::Error,
        )
    }

    async fn ask_explicit(&self, session: &Session, question: &str) -> (String, TurnMethod) {
        let show_trace = self.policy.should_include(session.memory.last());
        let recent: Vec<ConversationTurn> = session
            .memory
            .recent_context(self.context_turns)
            .into_iter()
            .cloned()
            .collect();

        let mut trace = WorkflowTrace::new();
        let outcome = AssertUnwindSafe(self.run_pipeline(question, recent, show_trace, &mut trace))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(answer)) => return (answer, TurnMethod::Manual),
            Ok(Err(e)) => e,
            Err(payload) => panic_error(payload),
        };

        tracing::warn!(error = %error, "Explicit pipeline failed");
        let steps = if trace.is_empty() {
            "(none)".to_string()
        } else {
            trace.bullets()
        };
        (
            format!(
                "Error in explicit pipeline: {}\n\nCompleted steps:\n{}\n\nOriginal question: {}",
                error, steps, question
            ),
            TurnMethod::Error,
        )
    }

    async fn run_pipeline(
        &self,
        question: &str,
        recent: Vec<ConversationTurn>,
        show_trace: bool,
        trace: &mut WorkflowTrace,
    ) -> AppResult<String> {
        // Translate
        trace.push("Generating structured query...");
        let query = self.parts.translator.translate(question, &self.schema).await;
        trace.push(format!(
            "Query generated{}: {}",
            if query.fallback { " (fallback)" } else { "" },
            preview(&query.text, QUERY_PREVIEW_CHARS)
        ));
        tracing::info!(fallback = query.fallback, "Query ready");

        // Execute
        trace.push("Executing query on structured store...");
        let rows = match self.parts.runner.run_query(&query.text).await {
            Ok(rows) => {
                trace.push(format!("Found {} records", rows.len()));
                rows
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query execution failed");
                trace.push(format!("Query execution failed: {}", e));
                return self
                    .answer_without_data(question, &e.to_string(), show_trace, trace)
                    .await;
            }
        };

        // Summarize
        trace.push("Analyzing data...");
        let summary = self.summarize(question, &rows, trace).await;

        // Retrieve
        trace.push("Searching related documents...");
        let documents = match self.search(question).await {
            Ok(docs) if docs.is_empty() => {
                trace.push("No related documents found");
                NO_DOCUMENTS.to_string()
            }
            Ok(docs) => {
                trace.push(format!("Found {} related documents", docs.len()));
                format_documents(&docs)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Document search failed");
                trace.push(format!("Document search failed: {}", e));
                format!("Could not retrieve news: {}", e)
            }
        };

        // Synthesize
        trace.push("Generating final answer...");
        let context = ContextBundle {
            query: query.text,
            summary,
            record_count: rows.len(),
            documents,
            recent_turns: recent,
        }
        .render();

        let answer = match self.synthesize(question, &context).await {
            Ok(answer) => {
                trace.push("Final answer generated");
                answer
            }
            Err(e) => {
                tracing::warn!(error = %e, "Answer synthesis failed");
                trace.push(format!("Answer synthesis failed: {}", e));
                format!("Could not synthesize an answer: {}\n\n{}", e, context)
            }
        };

        Ok(with_trace(answer, show_trace, trace))
    }

    async fn summarize(&self, question: &str, rows: &ResultSet, trace: &mut WorkflowTrace) -> String {
        if rows.is_empty() {
            trace.push("No data to analyze");
            return NO_DATA_SUMMARY.to_string();
        }

        match self.parts.summarizer.summarize(question, rows).await {
            Ok(summary) if !summary.trim().is_empty() => {
                trace.push("Data analysis completed");
                summary
            }
            Ok(_) => {
                trace.push("Data analysis returned nothing, using sample");
                fallback_summary(rows)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Summarizer failed, using sample");
                trace.push(format!("Data analysis failed: {}", e));
                fallback_summary(rows)
            }
        }
    }

    async fn search(&self, question: &str) -> AppResult<Vec<Document>> {
        let docs = self
            .parts
            .index
            .search_similar(question, self.search_limit)
            .await?;
        Ok(if self.dedupe { dedupe_documents(docs) } else { docs })
    }

    async fn synthesize(&self, question: &str, context: &str) -> AppResult<String> {
        let answer = self.parts.synthesizer.synthesize(question, context).await?;
        if answer.trim().is_empty() {
            return Err(AppError::Generation(
                "synthesizer returned an empty answer".to_string(),
            ));
        }
        Ok(answer)
    }

    /// Answer from documents alone after the structured query failed.
    async fn answer_without_data(
        &self,
        question: &str,
        error: &str,
        show_trace: bool,
        trace: &mut WorkflowTrace,
    ) -> AppResult<String> {
        trace.push("Searching related documents without structured data...");

        let docs = match self.search(question).await {
            Ok(docs) => docs,
            Err(search_error) => {
                trace.push(format!("Document search failed: {}", search_error));
                return Ok(multiple_errors(error, "Document search error", &search_error, trace));
            }
        };

        if docs.is_empty() {
            trace.push("No related documents found");
            let answer = format!(
                "Unable to access structured data: {}\n{}\n\nPlease rephrase your question or check the data source configuration.",
                error, NO_DOCUMENTS
            );
            return Ok(with_trace(answer, show_trace, trace));
        }

        trace.push(format!("Found {} related documents", docs.len()));
        let context = format!(
            "Note: Structured query failed with error: {}\n\nHowever, here is relevant information from news sources:\n\n{}",
            error,
            format_documents(&docs)
        );

        match self.synthesize(question, &context).await {
            Ok(answer) => {
                trace.push("Answer generated from document context");
                let answer = if answer.contains(error) {
                    answer
                } else {
                    format!("{}\n\nNote: structured data was unavailable ({}).", answer, error)
                };
                Ok(with_trace(answer, show_trace, trace))
            }
            Err(synthesis_error) => {
                trace.push(format!("Answer synthesis failed: {}", synthesis_error));
                Ok(multiple_errors(error, "Answer synthesis error", &synthesis_error, trace))
            }
        }
    }
}

fn with_trace(answer: String, show_trace: bool, trace: &WorkflowTrace) -> String {
    if show_trace {
        format!("{}{}", answer, trace.render())
    } else {
        answer
    }
}

fn multiple_errors(data_error: &str, label: &str, second: &AppError, trace: &WorkflowTrace) -> String {
    format!(
        "Multiple errors occurred:\n1. Structured data error: {}\n2. {}: {}\n\nCompleted steps:\n{}",
        data_error,
        label,
        second,
        trace.bullets()
    )
}

fn panic_error(payload: Box<dyn Any + Send>) -> AppError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    AppError::Orchestration(format!("panic: {}", message))
}

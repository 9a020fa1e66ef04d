//! Question answering orchestration for epiqa.
//!
//! [`Orchestrator::ask`] turns a free-text question about surveillance data
//! into an answer using one of two strategies:
//!
//! - **explicit**: translate to a query, execute it, summarize the rows,
//!   retrieve related documents and synthesize an answer, degrading stage by
//!   stage when a collaborator fails;
//! - **delegated**: hand the question to an [`AgentRunner`].
//!
//! Every call appends exactly one [`ConversationTurn`] to the caller's
//! [`Session`] and returns text; errors and panics never escape.

pub mod agent;
pub mod context;
pub mod generation;
pub mod memory;
pub mod orchestrator;
pub mod policy;
pub mod summarizer;
pub mod synthesizer;
pub mod text;
pub mod trace;
pub mod translator;

#[cfg(test)]
mod tests;

pub use agent::{AgentRunner, AgentTurn, ToolAgent};
pub use context::ContextBundle;
pub use generation::GenerationSettings;
pub use memory::{ConversationMemory, ConversationTurn, Session, TurnCounts, TurnMethod};
pub use orchestrator::{Collaborators, Orchestrator};
pub use policy::MetadataPolicy;
pub use summarizer::{LlmResultSummarizer, ResultSummarizer, NO_DATA_SUMMARY};
pub use synthesizer::{AnswerSynthesizer, LlmAnswerSynthesizer};
pub use trace::WorkflowTrace;
pub use translator::{LlmQueryTranslator, QueryTranslator, StructuredQuery};

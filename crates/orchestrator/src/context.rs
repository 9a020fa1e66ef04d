//! Assembly of the synthesizer's context.

use crate::memory::ConversationTurn;
use crate::text::preview;
use epiqa_knowledge::Document;
use std::collections::HashSet;

/// Text shown when retrieval finds nothing.
pub const NO_DOCUMENTS: &str = "No related news articles found.";

const DESCRIPTION_CHARS: usize = 200;
const TURN_ANSWER_CHARS: usize = 200;

/// Everything the synthesizer sees besides the question.
///
/// Sections render in a fixed order: query, summary, record count,
/// documents, recent turns.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    pub query: String,
    pub summary: String,
    pub record_count: usize,
    pub documents: String,
    pub recent_turns: Vec<ConversationTurn>,
}

impl ContextBundle {
    pub fn render(&self) -> String {
        let mut out = String::from("=== STRUCTURED DATA ANALYSIS ===\n");
        out.push_str(&format!("Query executed: {}\n\n", self.query));
        out.push_str(&format!("Data summary:\n{}\n\n", self.summary));
        out.push_str(&format!("Records found: {}\n\n", self.record_count));
        out.push_str("=== RELATED NEWS CONTEXT ===\n");
        out.push_str(self.documents.trim_end());
        out.push('\n');

        if !self.recent_turns.is_empty() {
            out.push_str("\n=== RECENT CONVERSATION ===\n");
            for turn in &self.recent_turns {
                out.push_str(&format!(
                    "Q: {}\nA: {}\n",
                    turn.question,
                    preview(&turn.answer, TURN_ANSWER_CHARS)
                ));
            }
        }

        out
    }
}

/// Numbered listing of documents for prompts.
pub fn format_documents(documents: &[Document]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS.to_string();
    }

    let mut out = String::new();
    for (i, doc) in documents.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, doc.title));
        if !doc.source_name.is_empty() {
            out.push_str(&format!("   Source: {}\n", doc.source_name));
        }
        if !doc.url.is_empty() {
            out.push_str(&format!("   URL: {}\n", doc.url));
        }
        if !doc.description.is_empty() {
            out.push_str(&format!(
                "   Summary: {}\n",
                preview(&doc.description, DESCRIPTION_CHARS)
            ));
        }
        if let Some(published) = doc.published_at {
            out.push_str(&format!("   Published: {}\n", published.format("%Y-%m-%d")));
        }
        out.push('\n');
    }
    out
}

/// Keep the first occurrence of each document id, preserving order.
pub fn dedupe_documents(documents: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|doc| seen.insert(doc.id.clone()))
        .collect()
}

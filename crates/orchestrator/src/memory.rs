//! Per-session conversation log.

use crate::text::preview;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const SUMMARY_TURNS: usize = 5;
const QUESTION_PREVIEW_CHARS: usize = 60;
const ANSWER_PREVIEW_CHARS: usize = 80;

/// How a turn was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnMethod {
    Agent,
    Manual,
    Error,
}

impl TurnMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnMethod::Agent => "agent",
            TurnMethod::Manual => "manual",
            TurnMethod::Error => "error",
        }
    }
}

impl fmt::Display for TurnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One answered question. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub method: TurnMethod,
    pub asked_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, method: TurnMethod) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            method,
            asked_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.method == TurnMethod::Error
    }
}

/// Number of turns per method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnCounts {
    pub total: usize,
    pub agent: usize,
    pub manual: usize,
    pub error: usize,
}

/// Ordered log of turns, optionally capped at `max_turns`.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
    max_turns: Option<usize>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory that evicts the oldest turn once `max_turns` are stored.
    pub fn with_capacity(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: Some(max_turns.max(1)),
        }
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        if let Some(max) = self.max_turns {
            while self.turns.len() >= max {
                self.turns.remove(0);
            }
        }
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// The `n` most recent non-error turns, oldest first.
    pub fn recent_context(&self, n: usize) -> Vec<&ConversationTurn> {
        let mut recent: Vec<_> = self
            .turns
            .iter()
            .rev()
            .filter(|t| !t.is_error())
            .take(n)
            .collect();
        recent.reverse();
        recent
    }

    pub fn counts(&self) -> TurnCounts {
        self.turns.iter().fold(
            TurnCounts {
                total: self.turns.len(),
                ..TurnCounts::default()
            },
            |mut counts, turn| {
                match turn.method {
                    TurnMethod::Agent => counts.agent += 1,
                    TurnMethod::Manual => counts.manual += 1,
                    TurnMethod::Error => counts.error += 1,
                }
                counts
            },
        )
    }

    /// Counts per method and previews of the most recent turns.
    pub fn summary(&self) -> String {
        if self.turns.is_empty() {
            return "No conversation started.".to_string();
        }

        let counts = self.counts();
        let mut out = String::from("=== CONVERSATION SUMMARY ===\n\n");
        out.push_str(&format!("Total interactions: {}\n", counts.total));
        out.push_str(&format!("- Agent-based: {}\n", counts.agent));
        out.push_str(&format!("- Manual workflow: {}\n", counts.manual));
        out.push_str(&format!("- Errors: {}\n\n", counts.error));
        out.push_str(&format!("Recent interactions (last {}):\n", SUMMARY_TURNS));

        let skip = self.turns.len().saturating_sub(SUMMARY_TURNS);
        for (i, turn) in self.turns.iter().skip(skip).enumerate() {
            out.push_str(&format!(
                "\n{}. Q: {}\n   A: {}\n   Method: {}\n",
                i + 1,
                preview(&turn.question, QUESTION_PREVIEW_CHARS),
                preview(&turn.answer, ANSWER_PREVIEW_CHARS),
                turn.method
            ));
        }

        out
    }

    /// Every turn in full, oldest first.
    pub fn export(&self) -> String {
        if self.turns.is_empty() {
            return "No conversation to export.".to_string();
        }

        let mut out = String::from("=== CONVERSATION EXPORT ===\n\n");
        out.push_str(&format!("Total interactions: {}\n\n", self.turns.len()));

        for (i, turn) in self.turns.iter().enumerate() {
            out.push_str(&format!("--- Interaction {} ---\n", i + 1));
            out.push_str(&format!("Asked at: {}\n", turn.asked_at.to_rfc3339()));
            out.push_str(&format!("Method: {}\n\n", turn.method));
            out.push_str(&format!("Question:\n{}\n\n", turn.question));
            out.push_str(&format!("Answer:\n{}\n\n", turn.answer));
            out.push_str(&"-".repeat(50));
            out.push_str("\n\n");
        }

        out
    }

    /// Turns as a JSON array.
    pub fn export_json(&self) -> epiqa_core::AppResult<String> {
        Ok(serde_json::to_string_pretty(&self.turns)?)
    }
}

/// Conversation state for one user, passed explicitly into every `ask`.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub memory: ConversationMemory,
}

impl Session {
    pub fn new() -> Self {
        Self::with_memory(ConversationMemory::new())
    }

    pub fn with_memory(memory: ConversationMemory) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            memory,
        }
    }

    /// Session whose memory is capped when `max_turns` is set.
    pub fn with_max_turns(max_turns: Option<usize>) -> Self {
        match max_turns {
            Some(max) => Self::with_memory(ConversationMemory::with_capacity(max)),
            None => Self::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with(methods: &[TurnMethod]) -> ConversationMemory {
        let mut memory = ConversationMemory::new();
        for (i, method) in methods.iter().enumerate() {
            memory.append(ConversationTurn::new(
                format!("question {}", i + 1),
                format!("answer {}", i + 1),
                *method,
            ));
        }
        memory
    }

    #[test]
    fn test_empty_memory_messages() {
        let memory = ConversationMemory::new();
        assert_eq!(memory.summary(), "No conversation started.");
        assert_eq!(memory.export(), "No conversation to export.");
        assert!(memory.last().is_none());
    }

    #[test]
    fn test_recent_context_skips_errors() {
        use TurnMethod::*;
        let memory = memory_with(&[Manual, Agent, Manual, Error, Error]);

        let recent: Vec<_> = memory
            .recent_context(3)
            .into_iter()
            .map(|t| t.question.as_str())
            .collect();
        assert_eq!(recent, vec!["question 1", "question 2", "question 3"]);
    }

    #[test]
    fn test_counts() {
        use TurnMethod::*;
        let counts = memory_with(&[Manual, Agent, Error, Manual]).counts();
        assert_eq!(
            counts,
            TurnCounts {
                total: 4,
                agent: 1,
                manual: 2,
                error: 1
            }
        );
    }

    #[test]
    fn test_summary_limits_previews() {
        let memory = memory_with(&[TurnMethod::Manual; 8]);
        let summary = memory.summary();

        assert!(summary.contains("Total interactions: 8"));
        assert_eq!(summary.matches("Q: ").count(), 5);
        assert!(summary.contains("Q: question 8"));
        assert!(!summary.contains("Q: question 3\n"));
    }

    #[test]
    fn test_summary_truncates_long_text() {
        let mut memory = ConversationMemory::new();
        memory.append(ConversationTurn::new(
            "q".repeat(100),
            "a".repeat(100),
            TurnMethod::Agent,
        ));

        let summary = memory.summary();
        assert!(summary.contains(&format!("Q: {}...", "q".repeat(60))));
        assert!(summary.contains(&format!("A: {}...", "a".repeat(80))));
    }

    #[test]
    fn test_export_in_order() {
        let memory = memory_with(&[TurnMethod::Manual, TurnMethod::Error, TurnMethod::Agent]);
        let export = memory.export();

        assert_eq!(export.matches("--- Interaction ").count(), 3);
        let first = export.find("question 1").unwrap();
        let second = export.find("question 2").unwrap();
        let third = export.find("question 3").unwrap();
        assert!(first < second && second < third);
        assert!(export.contains("Method: error"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut memory = ConversationMemory::with_capacity(2);
        for i in 0..3 {
            memory.append(ConversationTurn::new(format!("q{}", i), "a", TurnMethod::Manual));
        }

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.turns()[0].question, "q1");
    }

    #[test]
    fn test_export_json() {
        let memory = memory_with(&[TurnMethod::Agent]);
        let json: serde_json::Value = serde_json::from_str(&memory.export_json().unwrap()).unwrap();
        assert_eq!(json[0]["method"], "agent");
        assert_eq!(json[0]["question"], "question 1");
    }

    #[test]
    fn test_clear() {
        let mut memory = memory_with(&[TurnMethod::Manual]);
        memory.clear();
        assert!(memory.is_empty());
    }
}

//! Metadata-inclusion policy.

use crate::memory::ConversationTurn;
use epiqa_core::config::DEFAULT_METADATA_KEYWORDS;

/// Decides whether an explicit answer carries its workflow trace.
///
/// The trace is shown when the *previous* question asked for explanation or
/// step visibility, i.e. contains one of the configured keywords.
#[derive(Debug, Clone)]
pub struct MetadataPolicy {
    keywords: Vec<String>,
}

impl MetadataPolicy {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .filter(|k| !k.trim().is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn should_include(&self, previous: Option<&ConversationTurn>) -> bool {
        let Some(turn) = previous else {
            return false;
        };
        let question = turn.question.to_lowercase();
        self.keywords.iter().any(|k| question.contains(k.as_str()))
    }
}

impl Default for MetadataPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TurnMethod;

    fn turn(question: &str) -> ConversationTurn {
        ConversationTurn::new(question, "answer", TurnMethod::Manual)
    }

    #[test]
    fn test_no_previous_turn() {
        assert!(!MetadataPolicy::default().should_include(None));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let policy = MetadataPolicy::default();
        assert!(policy.should_include(Some(&turn("Please EXPLAIN the trend"))));
        assert!(policy.should_include(Some(&turn("show steps for that"))));
        assert!(!policy.should_include(Some(&turn("Total deaths in 2023?"))));
    }

    #[test]
    fn test_custom_keywords() {
        let policy = MetadataPolicy::new(["Trace", " "]);
        assert_eq!(policy.keywords(), &["trace".to_string()]);
        assert!(policy.should_include(Some(&turn("trace it"))));
        assert!(!policy.should_include(Some(&turn("explain it"))));
    }
}

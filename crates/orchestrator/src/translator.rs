//! Natural-language to structured query translation.

use crate::generation::{generate, GenerationSettings};
use crate::text::strip_code_fences;
use async_trait::async_trait;
use epiqa_core::{AppError, AppResult};
use epiqa_data::SchemaCatalog;
use epiqa_llm::TextGenerator;
use epiqa_prompt::PromptLibrary;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query text plus whatever the generator said about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Never empty
    pub text: String,
    pub explanation: Option<String>,
    pub confidence: Option<f32>,
    /// Set when `text` is the bounded fallback rather than a translation
    pub fallback: bool,
}

impl StructuredQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            explanation: None,
            confidence: None,
            fallback: false,
        }
    }

    /// Safe bounded query over `table`, used when translation fails.
    pub fn fallback(table: &str, reason: &str) -> Self {
        Self {
            text: format!("SELECT * FROM {} WHERE 1=1 LIMIT 100", table),
            explanation: Some(format!("Fallback query: {}", reason)),
            confidence: Some(0.0),
            fallback: true,
        }
    }
}

/// Builds a query for a question against a known schema.
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    /// Translate, reporting failures as `AppError::Translation`.
    async fn try_translate(&self, question: &str, schema: &SchemaCatalog)
        -> AppResult<StructuredQuery>;

    /// Translate, substituting the fallback query on any failure.
    async fn translate(&self, question: &str, schema: &SchemaCatalog) -> StructuredQuery {
        match self.try_translate(question, schema).await {
            Ok(query) if !query.text.trim().is_empty() => query,
            Ok(_) => StructuredQuery::fallback(&schema.table, "translator returned empty text"),
            Err(e) => {
                tracing::warn!(error = %e, "Translation failed, using fallback query");
                StructuredQuery::fallback(&schema.table, &e.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryReply {
    #[serde(default, alias = "sql_query", alias = "sql")]
    query: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default, alias = "confidence_score")]
    confidence: Option<f32>,
}

/// Parse a generator reply holding either a JSON object or a bare query.
pub fn parse_query_reply(reply: &str) -> Option<StructuredQuery> {
    let body = strip_code_fences(reply);

    if body.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<QueryReply>(body) {
            let text = strip_code_fences(&parsed.query).trim().to_string();
            if text.is_empty() {
                return None;
            }
            return Some(StructuredQuery {
                text,
                explanation: parsed.explanation.filter(|e| !e.trim().is_empty()),
                confidence: parsed.confidence,
                fallback: false,
            });
        }
    }

    let text = body.trim();
    if text.is_empty() {
        None
    } else {
        Some(StructuredQuery::new(text))
    }
}

/// Translator backed by the `query.generate` and `query.validate` prompts.
pub struct LlmQueryTranslator {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptLibrary>,
    settings: GenerationSettings,
    validate: bool,
}

impl LlmQueryTranslator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptLibrary>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            generator,
            prompts,
            settings,
            validate: true,
        }
    }

    /// Toggle the second validate-and-repair pass.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    async fn draft(&self, question: &str, schema: &SchemaCatalog) -> AppResult<StructuredQuery> {
        let columns = schema.render();
        let prompt = self.prompts.render(
            "query.generate",
            &[
                ("question", question),
                ("schema", &columns),
                ("table", &schema.table),
            ],
        )?;
        let reply = generate(self.generator.as_ref(), &self.settings, prompt).await?;
        parse_query_reply(&reply)
            .ok_or_else(|| AppError::Translation("generator returned no query".to_string()))
    }

    async fn repair(
        &self,
        question: &str,
        schema: &SchemaCatalog,
        draft: &StructuredQuery,
    ) -> AppResult<Option<StructuredQuery>> {
        let columns = schema.render();
        let prompt = self.prompts.render(
            "query.validate",
            &[
                ("query", &draft.text),
                ("schema", &columns),
                ("question", question),
            ],
        )?;
        let reply = generate(self.generator.as_ref(), &self.settings, prompt).await?;
        Ok(parse_query_reply(&reply))
    }
}

#[async_trait]
impl QueryTranslator for LlmQueryTranslator {
    #[tracing::instrument(skip(self, schema), fields(table = %schema.table))]
    async fn try_translate(
        &self,
        question: &str,
        schema: &SchemaCatalog,
    ) -> AppResult<StructuredQuery> {
        let draft = self.draft(question, schema).await.map_err(|e| match e {
            AppError::Translation(_) => e,
            other => AppError::Translation(other.to_string()),
        })?;

        if !self.validate {
            return Ok(draft);
        }

        match self.repair(question, schema, &draft).await {
            Ok(Some(repaired)) => {
                tracing::debug!(changed = repaired.text != draft.text, "Query validated");
                Ok(StructuredQuery {
                    text: repaired.text,
                    explanation: repaired.explanation.or(draft.explanation),
                    confidence: repaired.confidence.or(draft.confidence),
                    fallback: false,
                })
            }
            Ok(None) => {
                tracing::warn!("Validation returned no query, keeping draft");
                Ok(draft)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Validation failed, keeping draft");
                Ok(draft)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{schema, ScriptedGenerator};

    fn translator(replies: Vec<Result<String, String>>, validate: bool) -> (LlmQueryTranslator, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let translator = LlmQueryTranslator::new(
            generator.clone(),
            Arc::new(PromptLibrary::builtin().unwrap()),
            GenerationSettings::new("test-model"),
        )
        .with_validation(validate);
        (translator, generator)
    }

    #[test]
    fn test_parse_json_reply() {
        let query = parse_query_reply(
            "```json\n{\"query\": \"SELECT COUNT(*) FROM srag\", \"explanation\": \"counts rows\", \"confidence\": 0.9}\n```",
        )
        .unwrap();
        assert_eq!(query.text, "SELECT COUNT(*) FROM srag");
        assert_eq!(query.explanation.as_deref(), Some("counts rows"));
        assert_eq!(query.confidence, Some(0.9));
    }

    #[test]
    fn test_parse_bare_sql() {
        let query = parse_query_reply("```sql\nSELECT SG_UF FROM srag\n```").unwrap();
        assert_eq!(query.text, "SELECT SG_UF FROM srag");
        assert!(!query.fallback);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_query_reply("   ").is_none());
        assert!(parse_query_reply("{\"query\": \"\"}").is_none());
    }

    #[test]
    fn test_fallback_query() {
        let query = StructuredQuery::fallback("srag", "offline");
        assert_eq!(query.text, "SELECT * FROM srag WHERE 1=1 LIMIT 100");
        assert!(query.fallback);
    }

    #[tokio::test]
    async fn test_validation_repairs_draft() {
        let (translator, generator) = translator(
            vec![
                Ok("SELECT COUNT(*) FROM srag WHERE".to_string()),
                Ok("SELECT COUNT(*) FROM srag".to_string()),
            ],
            true,
        );

        let query = translator.translate("How many cases?", &schema()).await;
        assert_eq!(query.text, "SELECT COUNT(*) FROM srag");
        assert_eq!(generator.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_draft() {
        let (translator, _) = translator(
            vec![
                Ok("SELECT COUNT(*) FROM srag".to_string()),
                Err("model overloaded".to_string()),
            ],
            true,
        );

        let query = translator.translate("How many cases?", &schema()).await;
        assert_eq!(query.text, "SELECT COUNT(*) FROM srag");
        assert!(!query.fallback);
    }

    #[tokio::test]
    async fn test_draft_failure_uses_fallback() {
        let (translator, generator) = translator(vec![Err("connection refused".to_string())], true);

        let query = translator.translate("How many cases?", &schema()).await;
        assert!(query.fallback);
        assert_eq!(query.text, "SELECT * FROM srag WHERE 1=1 LIMIT 100");
        assert!(query.explanation.unwrap().contains("connection refused"));
        assert_eq!(generator.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_no_validation_pass_when_disabled() {
        let (translator, generator) =
            translator(vec![Ok("SELECT 1 FROM srag".to_string())], false);

        let query = translator.try_translate("q", &schema()).await.unwrap();
        assert_eq!(query.text, "SELECT 1 FROM srag");
        assert_eq!(generator.requests().len(), 1);
    }
}

//! Natural-language summaries of query results.

use crate::generation::{generate, GenerationSettings};
use crate::text::truncate_chars;
use async_trait::async_trait;
use epiqa_core::AppResult;
use epiqa_data::ResultSet;
use epiqa_llm::TextGenerator;
use epiqa_prompt::PromptLibrary;
use std::sync::Arc;

/// Summary used when a query returns no rows.
pub const NO_DATA_SUMMARY: &str = "No data found for the specified criteria.";

/// Rows shown to the generator.
const SAMPLE_ROWS: usize = 10;

const FALLBACK_SAMPLE_CHARS: usize = 200;

#[async_trait]
pub trait ResultSummarizer: Send + Sync {
    /// Summarize a non-empty result set.
    async fn summarize(&self, question: &str, rows: &ResultSet) -> AppResult<String>;
}

/// Summary substituted when the summarizer fails.
pub fn fallback_summary(rows: &ResultSet) -> String {
    let sample = rows.sample(SAMPLE_ROWS);
    format!(
        "Found {} records. Sample: {}...",
        rows.len(),
        truncate_chars(&sample, FALLBACK_SAMPLE_CHARS)
    )
}

/// Two-pass summarizer: a statistical analysis, then insights drawn from it.
pub struct LlmResultSummarizer {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptLibrary>,
    settings: GenerationSettings,
}

impl LlmResultSummarizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptLibrary>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            generator,
            prompts,
            settings,
        }
    }
}

#[async_trait]
impl ResultSummarizer for LlmResultSummarizer {
    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn summarize(&self, question: &str, rows: &ResultSet) -> AppResult<String> {
        let data = rows.sample(SAMPLE_ROWS);
        let row_count = rows.len().to_string();

        let analysis_prompt = self.prompts.render(
            "summary.analysis",
            &[
                ("question", question),
                ("data", &data),
                ("row_count", &row_count),
            ],
        )?;
        let analysis = generate(self.generator.as_ref(), &self.settings, analysis_prompt).await?;

        let insights_prompt = self.prompts.render(
            "summary.insights",
            &[("question", question), ("analysis", &analysis)],
        )?;
        let insights = generate(self.generator.as_ref(), &self.settings, insights_prompt).await?;

        Ok(format!(
            "Statistical Analysis:\n{}\n\nKey Insights:\n{}",
            analysis, insights
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{case_rows, ScriptedGenerator};

    fn summarizer(replies: Vec<Result<String, String>>) -> (LlmResultSummarizer, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let summarizer = LlmResultSummarizer::new(
            generator.clone(),
            Arc::new(PromptLibrary::builtin().unwrap()),
            GenerationSettings::new("test-model"),
        );
        (summarizer, generator)
    }

    #[tokio::test]
    async fn test_two_pass_summary() {
        let (summarizer, generator) = summarizer(vec![
            Ok("SP leads with 120 cases.".to_string()),
            Ok("Transmission concentrated in the southeast.".to_string()),
        ]);

        let summary = summarizer.summarize("Cases by state?", &case_rows()).await.unwrap();
        assert_eq!(
            summary,
            "Statistical Analysis:\nSP leads with 120 cases.\n\nKey Insights:\nTransmission concentrated in the southeast."
        );

        let requests = generator.requests();
        assert!(requests[0].prompt.contains("SP | 120"));
        assert!(requests[1].prompt.contains("SP leads with 120 cases."));
    }

    #[tokio::test]
    async fn test_insights_failure_propagates() {
        let (summarizer, _) = summarizer(vec![Ok("analysis".to_string()), Err("timeout".to_string())]);
        assert!(summarizer.summarize("q", &case_rows()).await.is_err());
    }

    #[test]
    fn test_fallback_summary() {
        let summary = fallback_summary(&case_rows());
        assert!(summary.starts_with("Found 2 records. Sample: SG_UF | total"));
        assert!(summary.ends_with("..."));
    }
}

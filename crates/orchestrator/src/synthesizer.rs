//! Final answer synthesis.

use crate::generation::{generate, GenerationSettings};
use async_trait::async_trait;
use epiqa_core::AppResult;
use epiqa_llm::TextGenerator;
use epiqa_prompt::PromptLibrary;
use std::sync::Arc;

#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// Answer `question` from the assembled context.
    async fn synthesize(&self, question: &str, context: &str) -> AppResult<String>;
}

/// Synthesizer backed by the `answer.synthesize` prompt.
pub struct LlmAnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptLibrary>,
    settings: GenerationSettings,
}

impl LlmAnswerSynthesizer {
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
impl AnswerSynthesizer for LlmAnswerSynthesizer {
    #[tracing::instrument(skip(self, context), fields(context_len = context.len()))]
    async fn synthesize(&self, question: &str, context: &str) -> AppResult<String> {
        let prompt = self.prompts.render(
            "answer.synthesize",
            &[("question", question), ("context", context)],
        )?;
        generate(self.generator.as_ref(), &self.settings, prompt).await
    }
}

//! Shared plumbing for prompt-driven generation calls.

use epiqa_core::{AppError, AppResult};
use epiqa_llm::{LlmRequest, TextGenerator};
use epiqa_prompt::BuiltPrompt;

/// Model and sampling settings applied to every generation call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.1,
            max_tokens: 2048,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Send a built prompt and return the trimmed completion text.
///
/// Empty completions are reported as `AppError::Generation`.
pub async fn generate(
    generator: &dyn TextGenerator,
    settings: &GenerationSettings,
    prompt: BuiltPrompt,
) -> AppResult<String> {
    let source = prompt.metadata.source_prompt_id;
    let mut request = LlmRequest::new(prompt.user, &settings.model)
        .with_temperature(settings.temperature)
        .with_max_tokens(settings.max_tokens);
    if let Some(system) = prompt.system {
        request = request.with_system(system);
    }

    tracing::debug!(
        prompt = %source,
        provider = generator.provider_name(),
        prompt_len = request.prompt.len(),
        "Generating"
    );

    let response = generator.complete(&request).await.map_err(|e| match e {
        AppError::Generation(_) => e,
        other => AppError::Generation(other.to_string()),
    })?;

    let content = response.content.trim();
    if content.is_empty() {
        return Err(AppError::Generation(format!(
            "{} returned an empty completion for '{}'",
            generator.provider_name(),
            source
        )));
    }

    tracing::debug!(
        prompt = %source,
        tokens = response.usage.total_tokens,
        "Generation complete"
    );
    Ok(content.to_string())
}

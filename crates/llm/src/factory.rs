//! Text generator factory.
//!
//! Resolves a provider name from configuration into a concrete
//! [`TextGenerator`] implementation.

use crate::client::TextGenerator;
use crate::providers::{GeminiGenerator, OllamaGenerator};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create a text generator for the named provider.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "gemini")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required by Gemini)
///
/// # Errors
/// Returns an error message if the provider is unknown or a required
/// API key is missing.
pub fn create_generator(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn TextGenerator>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaGenerator::with_base_url(base_url)))
        }
        ProviderType::Gemini => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| "Gemini provider requires API key".to_string())?;
            let generator = match endpoint {
                Some(endpoint) => GeminiGenerator::with_endpoint(endpoint, key),
                None => GeminiGenerator::new(key),
            };
            Ok(Arc::new(generator))
        }
    }
}

//! Text generation for epiqa.
//!
//! Every language-model call in the workspace goes through the [`TextGenerator`]
//! trait, so the pipeline never depends on a concrete provider.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Gemini**: Google Generative Language API
//!
//! # Example
//! ```no_run
//! use epiqa_llm::{LlmRequest, OllamaGenerator, TextGenerator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = OllamaGenerator::new();
//! let request = LlmRequest::new("How is SRAG surveillance organised?", "llama3.2");
//! let response = generator.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmRequest, LlmResponse, LlmUsage, TextGenerator};
pub use factory::create_generator;
pub use providers::{GeminiGenerator, OllamaGenerator};
pub use types::ProviderType;

//! Provider adapters implementing [`TextGenerator`](crate::TextGenerator).

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiGenerator;
pub use ollama::OllamaGenerator;

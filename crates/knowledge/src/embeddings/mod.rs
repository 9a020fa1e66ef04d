//! Embedding providers for the document index.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

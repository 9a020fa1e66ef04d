//! Document index for epiqa.
//!
//! Stores news documents with their embeddings in SQLite and answers
//! "top-K most similar" lookups by brute-force cosine similarity.

pub mod document;
pub mod embeddings;
pub mod index;
pub mod sqlite_index;


// Re-export commonly used types
pub use document::{document_id, load_jsonl, Document};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::DocumentIndex;
pub use sqlite_index::SqliteDocumentIndex;

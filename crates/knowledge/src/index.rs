//! Semantic document search capability.

use crate::document::Document;
use epiqa_core::AppResult;

/// Top-K semantic search over indexed documents.
///
/// Failures are reported as `AppError::Retrieval`. Results are ordered by
/// descending similarity; no minimum score is applied.
#[async_trait::async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Return at most `limit` documents most similar to `text`.
    async fn search_similar(&self, text: &str, limit: usize) -> AppResult<Vec<Document>>;

    /// Embed and store `documents`, returning how many were written.
    async fn add_documents(&self, documents: &[Document]) -> AppResult<usize>;

    /// Number of stored entries.
    async fn count(&self) -> AppResult<usize>;
}

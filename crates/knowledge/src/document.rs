//! News document entity and JSONL loading.

use chrono::{DateTime, Utc};
use epiqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A news article retrievable by semantic similarity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identity of the document. Uniqueness is not enforced.
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub url: String,

    #[serde(default, alias = "published_date", alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "source")]
    pub source_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Document {
    /// Text used to compute the document's embedding.
    pub fn embedding_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.content)
            .trim()
            .to_string()
    }
}

/// Stable id derived from a document URL (hex SHA-256).
pub fn document_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Load documents from a JSON Lines file, one object per line.
///
/// Blank lines are skipped. Documents without an id get one derived from
/// their URL, or from their title when the URL is empty too.
pub fn load_jsonl(path: &Path) -> AppResult<Vec<Document>> {
    let contents = std::fs::read_to_string(path)?;
    let mut documents = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let mut document: Document = serde_json::from_str(line).map_err(|e| {
            AppError::Serialization(format!(
                "{}:{}: invalid document: {}",
                path.display(),
                line_no + 1,
                e
            ))
        })?;

        if document.id.is_empty() {
            let key = if document.url.is_empty() {
                &document.title
            } else {
                &document.url
            };
            document.id = document_id(key);
        }

        documents.push(document);
    }

    tracing::debug!(count = documents.len(), "Loaded documents from {:?}", path);
    Ok(documents)
}

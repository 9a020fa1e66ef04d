//! SQLite-backed vector index for news documents.

use crate::document::Document;
use crate::embeddings::EmbeddingProvider;
use crate::index::DocumentIndex;
use chrono::{DateTime, Utc};
use epiqa_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Document index stored in a single SQLite file.
///
/// Every `add_documents` call writes new rows, so re-indexing the same
/// document produces duplicates; callers decide whether to dedupe results.
#[derive(Debug, Clone)]
pub struct SqliteDocumentIndex {
    db_path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteDocumentIndex {
    pub fn new(db_path: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            db_path: db_path.into(),
            embedder,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Delete every stored document.
    pub async fn reset(&self) -> AppResult<()> {
        let db_path = self.db_path.clone();
        blocking(move || {
            let conn = init_index(&db_path)?;
            conn.execute("DELETE FROM documents", [])
                .map_err(|e| AppError::Retrieval(format!("Failed to delete documents: {}", e)))?;
            tracing::info!("Reset document index");
            Ok(())
        })
        .await
    }
}

async fn blocking<T, F>(f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Retrieval(format!("Index task failed: {}", e)))?
}

/// Open the index database, creating the schema if needed.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Retrieval(format!("Failed to create index directory: {}", e))
        })?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            row_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            description TEXT NOT NULL,
            url TEXT NOT NULL,
            published_at TEXT,
            source_name TEXT NOT NULL,
            image_url TEXT,
            indexed_at TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_document_id ON documents(document_id);
        "#,
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized document index at {:?}", db_path);
    Ok(conn)
}

/// Insert one document with its embedding.
pub fn insert_document(conn: &Connection, document: &Document, embedding: &[f32]) -> AppResult<()> {
    conn.execute(
        "INSERT INTO documents (row_id, document_id, title, content, description, url,
                                published_at, source_name, image_url, indexed_at, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            uuid::Uuid::new_v4().to_string(),
            document.id,
            document.title,
            document.content,
            document.description,
            document.url,
            document.published_at.map(|d| d.to_rfc3339()),
            document.source_name,
            document.image_url,
            Utc::now().to_rfc3339(),
            embedding_to_bytes(embedding),
        ],
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to insert document: {}", e)))?;

    Ok(())
}

/// Return the `top_k` documents most similar to `query_embedding`.
pub fn query_documents(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(Document, f32)>> {
    let mut stmt = conn
        .prepare(
            "SELECT document_id, title, content, description, url, published_at,
                    source_name, image_url, embedding
             FROM documents",
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let published_at: Option<String> = row.get(5)?;
            let embedding_bytes: Vec<u8> = row.get(8)?;

            let document = Document {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                description: row.get(3)?,
                url: row.get(4)?,
                published_at: published_at
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|d| d.with_timezone(&Utc)),
                source_name: row.get(6)?,
                image_url: row.get(7)?,
            };
            Ok((document, bytes_to_embedding(&embedding_bytes)))
        })
        .map_err(|e| AppError::Retrieval(format!("Failed to query documents: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (document, embedding) =
            row.map_err(|e| AppError::Retrieval(format!("Failed to read document: {}", e)))?;
        let score = cosine_similarity(query_embedding, &embedding);
        results.push((document, score));
    }

    // Stable sort keeps insertion order among equal scores
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} documents (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

fn count_documents(conn: &Connection) -> AppResult<usize> {
    conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|v| v as usize)
    .map_err(|e| AppError::Retrieval(format!("Failed to count documents: {}", e)))
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to an embedding vector. Trailing partial values are ignored.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[async_trait::async_trait]
impl DocumentIndex for SqliteDocumentIndex {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    async fn search_similar(&self, text: &str, limit: usize) -> AppResult<Vec<Document>> {
        if !self.db_path.exists() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(text).await.map_err(|e| match e {
            AppError::Retrieval(_) => e,
            other => AppError::Retrieval(other.to_string()),
        })?;

        let db_path = self.db_path.clone();
        let results = blocking(move || {
            let conn = init_index(&db_path)?;
            query_documents(&conn, &query_embedding, limit)
        })
        .await?;

        if let Some((_, top)) = results.first() {
            tracing::info!(
                "Retrieved {} documents (top score: {:.3})",
                results.len(),
                top
            );
        }

        Ok(results.into_iter().map(|(document, _)| document).collect())
    }

    async fn add_documents(&self, documents: &[Document]) -> AppResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(Document::embedding_text).collect();

        tracing::info!(
            "Embedding {} documents using provider '{}' (model: {})",
            texts.len(),
            self.embedder.provider_name(),
            self.embedder.model_name()
        );
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(AppError::Retrieval(format!(
                "Embedding provider returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let db_path = self.db_path.clone();
        let documents = documents.to_vec();
        blocking(move || {
            let mut conn = init_index(&db_path)?;
            let tx = conn
                .transaction()
                .map_err(|e| AppError::Retrieval(format!("Failed to begin transaction: {}", e)))?;
            for (document, embedding) in documents.iter().zip(embeddings.iter()) {
                insert_document(&tx, document, embedding)?;
            }
            tx.commit()
                .map_err(|e| AppError::Retrieval(format!("Failed to commit documents: {}", e)))?;
            Ok(documents.len())
        })
        .await
    }

    async fn count(&self) -> AppResult<usize> {
        if !self.db_path.exists() {
            return Ok(0);
        }

        let db_path = self.db_path.clone();
        blocking(move || {
            let conn = init_index(&db_path)?;
            count_documents(&conn)
        })
        .await
    }
}

//! Index command handler.

use super::setup;
use clap::Args;
use epiqa_core::{config::AppConfig, AppResult};
use epiqa_knowledge::{load_jsonl, DocumentIndex};
use std::path::PathBuf;

/// Load news documents from a JSONL file into the document index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// JSONL file, one document object per line
    pub file: PathBuf,

    /// Drop every indexed document first
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(file = ?self.file, "Executing index command");

        let documents = load_jsonl(&self.file)?;
        let index = setup::document_index(config)?;

        if self.reset {
            index.reset().await?;
        }

        let added = index.add_documents(&documents).await?;
        let total = index.count().await?;

        if self.json {
            let output = serde_json::json!({
                "file": self.file,
                "added": added,
                "total": total,
                "index": index.db_path(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Indexed {} documents ({} total)", added, total);
        }

        Ok(())
    }
}

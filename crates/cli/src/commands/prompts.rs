//! Prompts command handler.

use clap::Args;
use epiqa_core::{config::AppConfig, AppResult};
use epiqa_prompt::{list_prompts, load_prompt};
use std::path::Path;

/// List prompt definitions, including workspace overrides
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let entries = prompt_entries(&config.workspace)?;
        tracing::debug!(count = entries.len(), "Listing prompts");

        if self.json {
            let output: Vec<_> = entries
                .iter()
                .map(|(id, title)| serde_json::json!({ "id": id, "title": title }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for (id, title) in &entries {
                println!("{:<20} {}", id, title);
            }
        }

        Ok(())
    }
}

/// Id and title of every prompt visible from the workspace.
fn prompt_entries(workspace: &Path) -> AppResult<Vec<(String, String)>> {
    list_prompts(workspace)?
        .iter()
        .map(|id| load_prompt(workspace, id).map(|definition| (definition.id, definition.title)))
        .collect()
}

//! Schema command handler.

use super::setup;
use clap::Args;
use epiqa_core::{config::AppConfig, AppResult};

/// Show the columns of the queried table
#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SchemaCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runner = setup::query_runner(config);
        let schema = setup::schema_catalog(config, &runner).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&schema)?);
        } else {
            println!("Table: {} ({} columns)", schema.table, schema.len());
            println!("{}", schema.render());
        }

        Ok(())
    }
}

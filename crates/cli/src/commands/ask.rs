//! Ask command handler.

use super::setup;
use clap::Args;
use epiqa_core::{config::AppConfig, AppError, AppResult};
use epiqa_orchestrator::Session;

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Answer with the tool-using agent instead of the explicit pipeline
    #[arg(long)]
    pub agent: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(agent = self.agent, "Executing ask command");

        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let orchestrator = setup::orchestrator(config).await?;
        let mut session = Session::with_max_turns(config.orchestrator.max_turns);
        let answer = orchestrator.ask(&mut session, question, self.agent).await;

        if self.json {
            let method = session
                .memory
                .last()
                .map(|turn| turn.method.as_str())
                .unwrap_or("error");
            let output = serde_json::json!({
                "question": question,
                "answer": answer,
                "method": method,
                "provider": config.provider,
                "model": config.model,
                "session": session.id.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer);
        }

        Ok(())
    }
}

//! Interactive chat command handler.

use super::setup;
use clap::Args;
use epiqa_core::{config::AppConfig, AppResult};
use epiqa_orchestrator::Session;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive question session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Start with the tool-using agent instead of the explicit pipeline
    #[arg(long)]
    pub agent: bool,
}

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Quit,
    History,
    Export(Option<&'a str>),
    Clear,
    UseAgent,
    UseManual,
    Question(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command.to_lowercase().as_str() {
        "" => ChatInput::Empty,
        "quit" | "exit" if rest.is_empty() => ChatInput::Quit,
        "history" if rest.is_empty() => ChatInput::History,
        "clear" if rest.is_empty() => ChatInput::Clear,
        "agent" if rest.is_empty() => ChatInput::UseAgent,
        "manual" if rest.is_empty() => ChatInput::UseManual,
        "export" if rest.is_empty() => ChatInput::Export(None),
        "export" if looks_like_path(rest) => ChatInput::Export(Some(rest)),
        _ => ChatInput::Question(line),
    }
}

/// A single token with a file extension or a path separator, and no `?`.
fn looks_like_path(arg: &str) -> bool {
    if arg.contains('?') || arg.contains(char::is_whitespace) {
        return false;
    }
    arg.contains('/') || arg.contains('\\') || Path::new(arg).extension().is_some()
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let orchestrator = setup::orchestrator(config).await?;
        let mut session = Session::with_max_turns(config.orchestrator.max_turns);
        let mut use_agent = self.agent;

        tracing::info!(session = %session.id, "Chat session started");
        println!("epiqa chat. Commands: history, export [path], clear, agent, manual, quit");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{}> ", if use_agent { "agent" } else { "manual" });
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                ChatInput::Empty => continue,
                ChatInput::Quit => break,
                ChatInput::History => println!("{}", session.memory.summary()),
                ChatInput::Export(None) => println!("{}", session.memory.export()),
                ChatInput::Export(Some(path)) => println!("{}", export_to(&session, path)),
                ChatInput::Clear => {
                    session.memory.clear();
                    println!("Conversation cleared.");
                }
                ChatInput::UseAgent => {
                    use_agent = true;
                    println!("Using the agent.");
                }
                ChatInput::UseManual => {
                    use_agent = false;
                    println!("Using the explicit pipeline.");
                }
                ChatInput::Question(question) => {
                    let answer = orchestrator.ask(&mut session, question, use_agent).await;
                    println!("\n{}\n", answer);
                }
            }
        }

        tracing::info!(turns = session.memory.len(), "Chat session ended");
        Ok(())
    }
}

/// Export to `path` and describe the outcome. Failures leave the session running.
fn export_to(session: &Session, path: &str) -> String {
    match write_export(session, Path::new(path)) {
        Ok(()) => format!("Conversation exported to {}", path),
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Export failed");
            format!("Could not export conversation: {}", e)
        }
    }
}

/// Write the export to `path`; a `.json` extension selects JSON turns.
fn write_export(session: &Session, path: &Path) -> AppResult<()> {
    let contents = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => session.memory.export_json()?,
        _ => session.memory.export(),
    };
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use epiqa_orchestrator::{ConversationTurn, TurnMethod};
    use tempfile::TempDir;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input("  "), ChatInput::Empty);
        assert_eq!(parse_input("EXIT"), ChatInput::Quit);
        assert_eq!(parse_input("history"), ChatInput::History);
        assert_eq!(parse_input("export"), ChatInput::Export(None));
        assert_eq!(parse_input("export out.json"), ChatInput::Export(Some("out.json")));
        assert_eq!(parse_input("agent"), ChatInput::UseAgent);
        assert_eq!(parse_input("manual"), ChatInput::UseManual);
    }

    #[test]
    fn test_questions_starting_with_command_words() {
        assert_eq!(
            parse_input("history of flu in SP?"),
            ChatInput::Question("history of flu in SP?")
        );
        assert_eq!(parse_input("clear trends?"), ChatInput::Question("clear trends?"));
        assert_eq!(
            parse_input("Export volumes by state last year?"),
            ChatInput::Question("Export volumes by state last year?")
        );
        assert_eq!(parse_input("export volumes"), ChatInput::Question("export volumes"));
    }

    #[test]
    fn test_export_paths() {
        assert_eq!(parse_input("export chat.txt"), ChatInput::Export(Some("chat.txt")));
        assert_eq!(
            parse_input("export out/history"),
            ChatInput::Export(Some("out/history"))
        );
    }

    #[test]
    fn test_write_export_bad_path_is_error() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session
            .memory
            .append(ConversationTurn::new("Cases?", "120", TurnMethod::Manual));

        let missing = dir.path().join("missing").join("chat.txt");
        assert!(write_export(&session, &missing).is_err());

        let message = export_to(&session, &missing.to_string_lossy());
        assert!(message.starts_with("Could not export conversation: "));
        assert_eq!(session.memory.len(), 1);

        let ok = dir.path().join("chat.txt");
        assert!(export_to(&session, &ok.to_string_lossy()).starts_with("Conversation exported to "));
    }

    #[test]
    fn test_write_export_formats() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session
            .memory
            .append(ConversationTurn::new("Cases?", "120", TurnMethod::Manual));

        let text_path = dir.path().join("chat.txt");
        write_export(&session, &text_path).unwrap();
        let text = std::fs::read_to_string(&text_path).unwrap();
        assert!(text.starts_with("=== CONVERSATION EXPORT ==="));

        let json_path = dir.path().join("chat.json");
        write_export(&session, &json_path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json[0]["answer"], "120");
    }
}

//! Delegated strategy: a bounded tool-using agent.

use crate::generation::{generate, GenerationSettings};
use crate::memory::ConversationTurn;
use crate::text::{preview, strip_code_fences};
use async_trait::async_trait;
use epiqa_core::AppResult;
use epiqa_data::{QueryGuard, SchemaCatalog, StructuredQueryRunner};
use epiqa_knowledge::{Document, DocumentIndex};
use epiqa_llm::TextGenerator;
use epiqa_prompt::PromptLibrary;
use serde::Deserialize;
use std::sync::Arc;

const MAX_ITERATIONS: usize = 6;
const HISTORY_TURNS: usize = 10;
const HISTORY_ANSWER_CHARS: usize = 200;
const USED_DOCUMENTS: usize = 3;
const NEWS_LIMIT: usize = 5;
const QUERY_SAMPLE_ROWS: usize = 20;

/// What the delegated strategy produced for one question.
#[derive(Debug, Clone, Default)]
pub struct AgentTurn {
    pub answer: String,
    pub used_documents: Vec<Document>,
}

/// Black-box answering capability behind `use_agent = true`.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run_turn(&self, question: &str, history: &[ConversationTurn]) -> AppResult<AgentTurn>;
}

/// Tools the agent may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentTool {
    QueryDatabase,
    SearchRelatedNews,
    EpidemiologicalAnalysis,
    TemporalContext,
}

impl AgentTool {
    pub const ALL: [AgentTool; 4] = [
        AgentTool::QueryDatabase,
        AgentTool::SearchRelatedNews,
        AgentTool::EpidemiologicalAnalysis,
        AgentTool::TemporalContext,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentTool::QueryDatabase => "query_database",
            AgentTool::SearchRelatedNews => "search_related_news",
            AgentTool::EpidemiologicalAnalysis => "epidemiological_analysis",
            AgentTool::TemporalContext => "temporal_context",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            AgentTool::QueryDatabase => {
                "Run one read-only SQL SELECT against the surveillance table. Input: the SQL text."
            }
            AgentTool::SearchRelatedNews => {
                "Find news articles related to a topic. Input: search text."
            }
            AgentTool::EpidemiologicalAnalysis => {
                "Interpret a data summary from an epidemiological point of view. Input: the summary."
            }
            AgentTool::TemporalContext => {
                "Explain seasonal and historical context for a question. Input: the question."
            }
        }
    }
}

/// One parsed model reply.
#[derive(Debug, Clone, PartialEq)]
enum AgentAction {
    Call { tool: String, input: String },
    Finish(String),
}

#[derive(Debug, Deserialize)]
struct AgentReply {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
    #[serde(default)]
    final_answer: Option<String>,
}

fn parse_action(reply: &str) -> AgentAction {
    let body = strip_code_fences(reply);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return AgentAction::Finish(body.to_string()),
    };

    let Ok(parsed) = serde_json::from_str::<AgentReply>(json) else {
        return AgentAction::Finish(body.to_string());
    };

    if let Some(answer) = parsed.final_answer.filter(|a| !a.trim().is_empty()) {
        return AgentAction::Finish(answer);
    }

    match parsed.tool.filter(|t| !t.trim().is_empty()) {
        Some(tool) => {
            let input = match parsed.input {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            AgentAction::Call { tool, input }
        }
        None => AgentAction::Finish(body.to_string()),
    }
}

fn render_history(history: &[ConversationTurn]) -> String {
    let mut recent: Vec<_> = history
        .iter()
        .rev()
        .filter(|t| !t.is_error())
        .take(HISTORY_TURNS)
        .collect();
    if recent.is_empty() {
        return "No previous conversation.".to_string();
    }
    recent.reverse();

    recent
        .iter()
        .map(|t| {
            format!(
                "Human: {}\nAssistant: {}",
                t.question,
                preview(&t.answer, HISTORY_ANSWER_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Agent that loops over generator replies, calling tools until it answers.
pub struct ToolAgent {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptLibrary>,
    settings: GenerationSettings,
    runner: Arc<dyn StructuredQueryRunner>,
    index: Arc<dyn DocumentIndex>,
    schema: SchemaCatalog,
    guard: QueryGuard,
    max_iterations: usize,
}

impl ToolAgent {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptLibrary>,
        settings: GenerationSettings,
        runner: Arc<dyn StructuredQueryRunner>,
        index: Arc<dyn DocumentIndex>,
        schema: SchemaCatalog,
    ) -> Self {
        Self {
            generator,
            prompts,
            settings,
            runner,
            index,
            schema,
            guard: QueryGuard,
            max_iterations: MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn tools_description(&self) -> String {
        let mut out = AgentTool::ALL
            .iter()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&format!(
            "\n\nTable `{}` columns:\n{}",
            self.schema.table,
            self.schema.render()
        ));
        out
    }

    /// Run one tool. Tool failures become observations, not errors.
    async fn call_tool(&self, name: &str, input: &str) -> String {
        let Some(tool) = AgentTool::parse(name) else {
            let available = AgentTool::ALL.map(|t| t.name()).join(", ");
            return format!("Unknown tool '{}'. Available tools: {}", name, available);
        };
        tracing::info!(tool = tool.name(), "Agent calling tool");

        match tool {
            AgentTool::QueryDatabase => self.query_database(input).await,
            AgentTool::SearchRelatedNews => self.search_news(input).await,
            AgentTool::EpidemiologicalAnalysis => {
                self.generate_tool("tool.epidemiology", &[("summary", input)])
                    .await
                    .unwrap_or_else(|e| format!("Epidemiological analysis failed: {}", e))
            }
            AgentTool::TemporalContext => self
                .generate_tool("tool.temporal", &[("question", input)])
                .await
                .unwrap_or_else(|e| format!("Temporal context failed: {}", e)),
        }
    }

    async fn query_database(&self, input: &str) -> String {
        let query = match self.guard.check(strip_code_fences(input)) {
            Ok(query) => query,
            Err(e) => return format!("Query rejected: {}", e),
        };

        match self.runner.run_query(&query).await {
            Ok(rows) if rows.is_empty() => "Query returned no rows.".to_string(),
            Ok(rows) => format!(
                "Query returned {} rows:\n{}",
                rows.len(),
                rows.sample(QUERY_SAMPLE_ROWS)
            ),
            Err(e) => format!("Query failed: {}", e),
        }
    }

    async fn search_news(&self, input: &str) -> String {
        match self.index.search_similar(input, NEWS_LIMIT).await {
            Ok(docs) if docs.is_empty() => "No related news found.".to_string(),
            Ok(docs) => docs
                .iter()
                .map(|d| format!("- {}\n  Source: {}\n  URL: {}", d.title, d.source_name, d.url))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => format!("News search failed: {}", e),
        }
    }

    async fn generate_tool(&self, prompt_id: &str, vars: &[(&str, &str)]) -> AppResult<String> {
        let prompt = self.prompts.render(prompt_id, vars)?;
        generate(self.generator.as_ref(), &self.settings, prompt).await
    }

    async fn used_documents(&self, question: &str) -> Vec<Document> {
        match self.index.search_similar(question, USED_DOCUMENTS).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "Could not look up documents for agent answer");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl AgentRunner for ToolAgent {
    #[tracing::instrument(skip(self, history), fields(history = history.len()))]
    async fn run_turn(&self, question: &str, history: &[ConversationTurn]) -> AppResult<AgentTurn> {
        let history_text = render_history(history);
        let tools = self.tools_description();
        let mut scratchpad = String::new();

        for iteration in 0..self.max_iterations {
            let work = if scratchpad.is_empty() {
                "(nothing yet)"
            } else {
                scratchpad.as_str()
            };
            let prompt = self.prompts.render(
                "agent.step",
                &[
                    ("question", question),
                    ("history", &history_text),
                    ("tools", &tools),
                    ("scratchpad", work),
                ],
            )?;
            let reply = generate(self.generator.as_ref(), &self.settings, prompt).await?;

            match parse_action(&reply) {
                AgentAction::Finish(answer) => {
                    tracing::info!(iterations = iteration + 1, "Agent answered");
                    return Ok(AgentTurn {
                        answer,
                        used_documents: self.used_documents(question).await,
                    });
                }
                AgentAction::Call { tool, input } => {
                    let observation = self.call_tool(&tool, &input).await;
                    scratchpad.push_str(&format!(
                        "Action: {}\nInput: {}\nObservation: {}\n\n",
                        tool, input, observation
                    ));
                }
            }
        }

        tracing::warn!(max = self.max_iterations, "Agent hit its iteration limit, forcing answer");
        let prompt = self.prompts.render(
            "agent.final",
            &[
                ("question", question),
                ("history", &history_text),
                ("scratchpad", &scratchpad),
            ],
        )?;
        let answer = generate(self.generator.as_ref(), &self.settings, prompt).await?;

        Ok(AgentTurn {
            answer,
            used_documents: self.used_documents(question).await,
        })
    }
}

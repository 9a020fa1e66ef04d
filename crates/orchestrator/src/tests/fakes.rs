//! Deterministic stand-ins for every capability the orchestrator calls.

use crate::agent::{AgentRunner, AgentTurn};
use crate::memory::ConversationTurn;
use crate::orchestrator::{Collaborators, Orchestrator};
use crate::summarizer::ResultSummarizer;
use crate::synthesizer::AnswerSynthesizer;
use crate::translator::{QueryTranslator, StructuredQuery};
use async_trait::async_trait;
use epiqa_core::config::OrchestratorConfig;
use epiqa_core::{AppError, AppResult};
use epiqa_data::{ResultSet, SchemaCatalog, StructuredQueryRunner, Value};
use epiqa_knowledge::{Document, DocumentIndex};
use epiqa_llm::{LlmRequest, LlmResponse, LlmUsage, TextGenerator};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn schema() -> SchemaCatalog {
    let mut columns = BTreeMap::new();
    columns.insert("SG_UF".to_string(), "TEXT".to_string());
    columns.insert("DT_NOTIFIC".to_string(), "DATE".to_string());
    columns.insert("EVOLUCAO".to_string(), "INTEGER".to_string());
    SchemaCatalog::new("srag", columns)
}

pub fn case_rows() -> ResultSet {
    ResultSet::new(
        vec!["SG_UF".to_string(), "total".to_string()],
        vec![
            vec![Value::Text("SP".to_string()), Value::Integer(120)],
            vec![Value::Text("RJ".to_string()), Value::Integer(80)],
        ],
    )
}

pub fn news(id: &str, title: &str) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{} in the latest bulletin", title),
        url: format!("https://news.example/{}", id),
        source_name: "Saúde Hoje".to_string(),
        ..Document::default()
    }
}

/// Generator replaying queued replies; `Err` entries fail the call.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::new(10, 5),
            }),
            Some(Err(message)) => Err(AppError::Generation(message)),
            None => Err(AppError::Generation("script exhausted".to_string())),
        }
    }
}

pub struct FakeTranslator {
    result: Result<String, String>,
}

impl FakeTranslator {
    pub fn returning(query: &str) -> Self {
        Self {
            result: Ok(query.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl QueryTranslator for FakeTranslator {
    async fn try_translate(&self, _question: &str, _schema: &SchemaCatalog) -> AppResult<StructuredQuery> {
        match &self.result {
            Ok(query) => Ok(StructuredQuery::new(query.clone())),
            Err(message) => Err(AppError::Translation(message.clone())),
        }
    }
}

pub struct FakeRunner {
    result: Result<ResultSet, String>,
    queries: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn returning(rows: ResultSet) -> Self {
        Self {
            result: Ok(rows),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredQueryRunner for FakeRunner {
    async fn run_query(&self, query: &str) -> AppResult<ResultSet> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.result {
            Ok(rows) => Ok(rows.clone()),
            Err(message) => Err(AppError::Execution(message.clone())),
        }
    }
}

pub struct PanickingRunner;

#[async_trait]
impl StructuredQueryRunner for PanickingRunner {
    async fn run_query(&self, _query: &str) -> AppResult<ResultSet> {
        panic!("driver crashed");
    }
}

pub struct FakeSummarizer {
    result: Result<String, String>,
    calls: AtomicUsize,
}

impl FakeSummarizer {
    pub fn returning(summary: &str) -> Self {
        Self {
            result: Ok(summary.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultSummarizer for FakeSummarizer {
    async fn summarize(&self, _question: &str, _rows: &ResultSet) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(AppError::Generation)
    }
}

pub struct FakeIndex {
    result: Result<Vec<Document>, String>,
    calls: AtomicUsize,
}

impl FakeIndex {
    pub fn returning(docs: Vec<Document>) -> Self {
        Self {
            result: Ok(docs),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentIndex for FakeIndex {
    async fn search_similar(&self, _text: &str, limit: usize) -> AppResult<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(docs) => Ok(docs.iter().take(limit).cloned().collect()),
            Err(message) => Err(AppError::Retrieval(message.clone())),
        }
    }

    async fn add_documents(&self, documents: &[Document]) -> AppResult<usize> {
        Ok(documents.len())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.result.as_ref().map(Vec::len).unwrap_or(0))
    }
}

/// Synthesizer that answers with the context it was given.
pub struct EchoSynthesizer {
    failure: Option<String>,
    contexts: Mutex<Vec<String>>,
}

impl EchoSynthesizer {
    pub fn new() -> Self {
        Self {
            failure: None,
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerSynthesizer for EchoSynthesizer {
    async fn synthesize(&self, question: &str, context: &str) -> AppResult<String> {
        self.contexts.lock().unwrap().push(context.to_string());
        match &self.failure {
            Some(message) => Err(AppError::Generation(message.clone())),
            None => Ok(format!("Answer to '{}' based on:\n{}", question, context)),
        }
    }
}

pub enum AgentBehaviour {
    Answer(String),
    Fail(String),
    Panic,
}

pub struct FakeAgent {
    behaviour: AgentBehaviour,
    histories: Mutex<Vec<usize>>,
}

impl FakeAgent {
    pub fn new(behaviour: AgentBehaviour) -> Self {
        Self {
            behaviour,
            histories: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self::new(AgentBehaviour::Answer(answer.to_string()))
    }

    /// History length seen on each call.
    pub fn histories(&self) -> Vec<usize> {
        self.histories.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRunner for FakeAgent {
    async fn run_turn(&self, _question: &str, history: &[ConversationTurn]) -> AppResult<AgentTurn> {
        self.histories.lock().unwrap().push(history.len());
        match &self.behaviour {
            AgentBehaviour::Answer(answer) => Ok(AgentTurn {
                answer: answer.clone(),
                used_documents: vec![news("a", "Flu wave")],
            }),
            AgentBehaviour::Fail(message) => Err(AppError::Generation(message.clone())),
            AgentBehaviour::Panic => panic!("agent exploded"),
        }
    }
}

/// Collaborators that all succeed.
pub fn healthy() -> Collaborators {
    Collaborators {
        translator: Arc::new(FakeTranslator::returning(
            "SELECT SG_UF, COUNT(*) AS total FROM srag GROUP BY SG_UF",
        )),
        runner: Arc::new(FakeRunner::returning(case_rows())),
        summarizer: Arc::new(FakeSummarizer::returning("SP leads with 120 cases")),
        index: Arc::new(FakeIndex::returning(vec![
            news("a", "Flu wave in São Paulo"),
            news("b", "Vaccination campaign extended"),
        ])),
        synthesizer: Arc::new(EchoSynthesizer::new()),
        agent: Arc::new(FakeAgent::answering("Agent says SP.")),
    }
}

/// Collaborators that all fail.
pub fn broken() -> Collaborators {
    Collaborators {
        translator: Arc::new(FakeTranslator::failing("translator down")),
        runner: Arc::new(FakeRunner::failing("database down")),
        summarizer: Arc::new(FakeSummarizer::failing("summarizer down")),
        index: Arc::new(FakeIndex::failing("index down")),
        synthesizer: Arc::new(EchoSynthesizer::failing("synthesizer down")),
        agent: Arc::new(FakeAgent::new(AgentBehaviour::Fail("agent down".to_string()))),
    }
}

pub fn orchestrator(parts: Collaborators) -> Orchestrator {
    Orchestrator::new(parts, schema(), &OrchestratorConfig::default())
}

//! Configuration management for epiqa.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.epiqa/config.yaml` in the workspace, or `EPIQA_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative paths for the structured
//! store and the document index are resolved against the workspace root.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "gemini"];

/// Meta-intent keywords that make the next explicit answer carry its trace.
pub const DEFAULT_METADATA_KEYWORDS: [&str; 6] =
    ["how", "explain", "why", "show steps", "debug", "details"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .epiqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Text generation provider ("ollama", "gemini")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Structured store settings
    pub data: DataConfig,

    /// Document index settings
    pub index: IndexConfig,

    /// Question answering pipeline settings
    pub orchestrator: OrchestratorConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::Gemini { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Gemini { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Structured store (SQLite) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataConfig {
    /// SQLite database holding the surveillance table
    pub database_path: PathBuf,

    /// Table the generated queries target
    pub table: String,

    /// Reject anything but a single SELECT/WITH statement
    pub read_only: bool,

    /// Column name -> semantic type. Empty means introspect at startup.
    pub schema: BTreeMap<String, String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("srag_data.db"),
            table: "srag_cases".to_string(),
            read_only: true,
            schema: BTreeMap::new(),
        }
    }
}

/// Document index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    /// SQLite file holding documents and their embeddings
    pub path: PathBuf,

    /// Embedding backend ("ollama", or "trigram" for offline use)
    pub embedding_provider: String,

    /// Embedding endpoint (Ollama)
    pub embedding_endpoint: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Documents retrieved per question
    pub search_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".epiqa/documents.db"),
            embedding_provider: "ollama".to_string(),
            embedding_endpoint: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            dimensions: 768,
            search_limit: 5,
        }
    }
}

/// Question answering pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Run the validate-and-repair pass over generated queries
    pub validate_queries: bool,

    /// Keywords in the previous question that make the answer carry its trace
    pub metadata_keywords: Vec<String>,

    /// Non-error turns included in the synthesis context
    pub context_turns: usize,

    /// Conversation capacity; None keeps every turn
    pub max_turns: Option<usize>,

    /// Drop documents whose id was already seen before building the context
    pub dedupe_documents: bool,

    /// Sampling temperature for every generation call
    pub temperature: f32,

    /// Token cap for every generation call
    pub max_tokens: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            validate_queries: true,
            metadata_keywords: DEFAULT_METADATA_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            context_turns: 3,
            max_turns: None,
            dedupe_documents: false,
            temperature: 0.1,
            max_tokens: 2048,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    data: Option<DataConfig>,
    index: Option<IndexConfig>,
    orchestrator: Option<OrchestratorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            data: DataConfig::default(),
            index: IndexConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file, environment variables and defaults.
    ///
    /// Environment variables:
    /// - `EPIQA_WORKSPACE`: Override workspace path
    /// - `EPIQA_CONFIG`: Path to config file
    /// - `EPIQA_PROVIDER`: LLM provider
    /// - `EPIQA_MODEL`: Model identifier
    /// - `EPIQA_API_KEY`: API key
    /// - `EPIQA_DATABASE`: Structured store path
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use epiqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with the workspace and config file chosen on
    /// the command line taking precedence over the environment.
    ///
    /// The config file defaults to `<workspace>/.epiqa/config.yaml`, so it is
    /// resolved against the final workspace.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace = workspace.or_else(|| env_path("EPIQA_WORKSPACE"));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("EPIQA_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.epiqa_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("EPIQA_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("EPIQA_MODEL") {
            config.model = model;
        }

        if let Ok(database) = std::env::var("EPIQA_DATABASE") {
            config.data.database_path = PathBuf::from(database);
        }

        config.api_key = std::env::var("EPIQA_API_KEY").ok();
        config.log_level = config.log_level.or_else(|| std::env::var("RUST_LOG").ok());

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(data) = config_file.data {
            result.data = data;
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }

        if let Some(orchestrator) = config_file.orchestrator {
            result.orchestrator = orchestrator;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and the environment.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .epiqa directory.
    pub fn epiqa_dir(&self) -> PathBuf {
        self.workspace.join(".epiqa")
    }

    /// Ensure the .epiqa directory exists.
    pub fn ensure_epiqa_dir(&self) -> AppResult<()> {
        let dir = self.epiqa_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .epiqa directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Structured store path, resolved against the workspace.
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.data.database_path)
    }

    /// Document index path, resolved against the workspace.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.index.path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get the configuration for a provider, if the config file declares one.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Endpoint override for a provider.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint().map(str::to_string))
    }

    /// Resolve API key from `EPIQA_API_KEY` or the provider's key variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::Gemini { api_key_env, .. }) => api_key_env,
            _ if provider == "gemini" => "GOOGLE_API_KEY".to_string(),
            _ => return None,
        };

        std::env::var(env_var).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "gemini" && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(
                "Gemini provider requires an API key (EPIQA_API_KEY or GOOGLE_API_KEY)"
                    .to_string(),
            ));
        }

        if self.data.table.trim().is_empty() {
            return Err(AppError::Config("data.table cannot be empty".to_string()));
        }

        if !["ollama", "trigram"].contains(&self.index.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: ollama, trigram",
                self.index.embedding_provider
            )));
        }

        if self.index.search_limit == 0 {
            return Err(AppError::Config(
                "index.searchLimit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

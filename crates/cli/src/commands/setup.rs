//! Wiring of production adapters from configuration.

use epiqa_core::{config::AppConfig, AppError, AppResult};
use epiqa_data::{SchemaCatalog, SqliteQueryRunner};
use epiqa_knowledge::{create_provider, SqliteDocumentIndex};
use epiqa_llm::create_generator;
use epiqa_orchestrator::{
    Collaborators, GenerationSettings, LlmAnswerSynthesizer, LlmQueryTranslator,
    LlmResultSummarizer, Orchestrator, ToolAgent,
};
use epiqa_prompt::PromptLibrary;
use std::sync::Arc;

/// Structured store adapter honouring `data.readOnly`.
pub fn query_runner(config: &AppConfig) -> SqliteQueryRunner {
    let runner = SqliteQueryRunner::new(config.database_path());
    if config.data.read_only {
        runner
    } else {
        runner.read_only(false).without_guard()
    }
}

/// Schema from config, or introspected from the store when none is configured.
pub async fn schema_catalog(config: &AppConfig, runner: &SqliteQueryRunner) -> AppResult<SchemaCatalog> {
    if !config.data.schema.is_empty() {
        return Ok(SchemaCatalog::new(
            config.data.table.clone(),
            config.data.schema.clone(),
        ));
    }

    tracing::debug!(table = %config.data.table, "Introspecting schema");
    runner.describe_table(&config.data.table).await
}

pub fn document_index(config: &AppConfig) -> AppResult<SqliteDocumentIndex> {
    let embedder = create_provider(
        &config.index.embedding_provider,
        &config.index.embedding_endpoint,
        &config.index.embedding_model,
        config.index.dimensions,
    )?;
    Ok(SqliteDocumentIndex::new(config.index_path(), embedder))
}

/// Build the orchestrator with every production collaborator.
pub async fn orchestrator(config: &AppConfig) -> AppResult<Orchestrator> {
    let endpoint = config.provider_endpoint(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let generator = create_generator(&config.provider, endpoint.as_deref(), api_key.as_deref())
        .map_err(AppError::Config)?;

    let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);
    let settings = GenerationSettings::new(&config.model)
        .with_temperature(config.orchestrator.temperature)
        .with_max_tokens(config.orchestrator.max_tokens);

    let runner = query_runner(config);
    let schema = schema_catalog(config, &runner).await?;
    let runner = Arc::new(runner);
    let index = Arc::new(document_index(config)?);

    let translator = LlmQueryTranslator::new(generator.clone(), prompts.clone(), settings.clone())
        .with_validation(config.orchestrator.validate_queries);
    let agent = ToolAgent::new(
        generator.clone(),
        prompts.clone(),
        settings.clone(),
        runner.clone(),
        index.clone(),
        schema.clone(),
    );

    let parts = Collaborators {
        translator: Arc::new(translator),
        runner,
        summarizer: Arc::new(LlmResultSummarizer::new(
            generator.clone(),
            prompts.clone(),
            settings.clone(),
        )),
        index,
        synthesizer: Arc::new(LlmAnswerSynthesizer::new(generator, prompts, settings)),
        agent: Arc::new(agent),
    };

    tracing::info!(
        provider = %config.provider,
        model = %config.model,
        table = %schema.table,
        columns = schema.len(),
        "Orchestrator ready"
    );

    Ok(Orchestrator::new(parts, schema, &config.orchestrator)
        .with_search_limit(config.index.search_limit))
}

//! Agenda Assistant
//!
//! Answers natural-language questions about a contacts store:
//! - Questions are normalized to a semantic key and served from a bounded cache
//! - Cache misses run an LLM-driven analyze, query, evaluate and respond pipeline
//! - Every model call falls back to a secondary model on failure

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use api::AppState;
use config::SessionConfig;
use domain::{
    ContactStore, LlmGateway, NameLexicon, QueryBuilder, QueryClassifier, SemanticCache,
};
use infrastructure::{
    llm::LlmProviderFactory,
    normalizer::{LlmQueryClassifier, Normalizer, RuleBasedClassifier},
    search::{AnswerResponder, ResultEvaluator, SearchPipeline, StrategyAnalyzer},
    semantic_cache::{CachePersistence, InMemorySemanticCache},
    services::AssistantService,
    store::SqliteContactStore,
};

/// Wired assistant plus the pieces front ends touch directly
#[derive(Debug, Clone)]
pub struct AssistantRuntime {
    pub assistant: Arc<AssistantService>,
    pub store: Arc<dyn ContactStore>,
    pub persistence: Option<CachePersistence>,
}

impl AssistantRuntime {
    pub fn app_state(&self, sessions: &SessionConfig) -> AppState {
        AppState::new(self.assistant.clone(), self.store.clone(), sessions)
    }

    /// Write the cache snapshot when persistence is configured
    pub async fn save_cache(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.save_from(self.assistant.cache().as_ref()).await;
        }
    }
}

/// Connect the store and the configured LLM provider, then wire the assistant
pub async fn create_runtime(config: &AppConfig) -> anyhow::Result<AssistantRuntime> {
    let store = SqliteContactStore::connect(&config.store).await?;
    store.ensure_schema().await?;

    let provider = LlmProviderFactory::create(&config.llm)?;
    let gateway = LlmProviderFactory::create_gateway(&config.llm, provider)?;

    create_runtime_with(config, gateway, Arc::new(store)).await
}

/// Wire the assistant around an existing gateway and store
pub async fn create_runtime_with(
    config: &AppConfig,
    gateway: Arc<dyn LlmGateway>,
    store: Arc<dyn ContactStore>,
) -> anyhow::Result<AssistantRuntime> {
    let options = config.llm.generation_options();

    let people = match store.known_people().await {
        Ok(people) => people,
        Err(e) => {
            warn!(error = %e, "Could not load contact names, misspelled names will not be corrected");
            Vec::new()
        }
    };
    info!(people = people.len(), "Name lexicon loaded");

    let rules: Arc<dyn QueryClassifier> = Arc::new(RuleBasedClassifier::new());
    let normalizer = if config.pipeline.llm_normalizer {
        Normalizer::new(Arc::new(LlmQueryClassifier::new(gateway.clone(), options)))
            .with_secondary(rules)
    } else {
        Normalizer::new(rules)
    }
    .with_lexicon(NameLexicon::new(people))
    .with_memo_capacity(config.cache.memo_capacity);

    let builder = QueryBuilder::new(config.store.table.as_str())?.with_max_rows(config.store.max_rows);
    let evaluator = ResultEvaluator::new(gateway.clone(), options)
        .with_ambiguity_threshold(config.pipeline.ambiguity_threshold)
        .with_max_rows_in_prompt(config.pipeline.max_rows_in_prompt);
    let responder = AnswerResponder::new(gateway.clone(), options)
        .with_max_rows_in_prompt(config.pipeline.max_rows_in_prompt);

    let pipeline = SearchPipeline::new(
        StrategyAnalyzer::new(gateway, options),
        builder,
        store.clone(),
        evaluator,
        responder,
    )
    .with_max_refinements(config.pipeline.max_refinements);

    let cache: Arc<dyn SemanticCache> = Arc::new(InMemorySemanticCache::from_config(&config.cache));
    let persistence = config
        .cache
        .persistence_path
        .as_ref()
        .map(|path| CachePersistence::new(path.clone()));
    if let Some(persistence) = &persistence {
        persistence.restore_into(cache.as_ref()).await;
    }

    let assistant = AssistantService::new(normalizer, cache, pipeline)
        .with_cache_enabled(config.cache.enabled);

    Ok(AssistantRuntime {
        assistant: Arc::new(assistant),
        store,
        persistence,
    })
}

use serde::Deserialize;

use crate::domain::semantic_cache::SemanticCacheConfig;
use crate::domain::GenerationOptions;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: SemanticCacheConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Gemini,
    Openai,
}

/// Model selection and sampling
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,
    /// Overrides the provider's public endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_fallback_max_tokens")]
    pub fallback_max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Contact store location and preview sizes
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound on rows fetched per statement
    #[serde(default = "default_max_rows")]
    pub max_rows: u32,
    #[serde(default = "default_preview_names")]
    pub preview_names: u32,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_refinements")]
    pub max_refinements: u32,
    /// Person queries returning more rows than this without a filter are ambiguous
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: usize,
    /// Rows shown to the model when evaluating and responding
    #[serde(default = "default_max_rows_in_prompt")]
    pub max_rows_in_prompt: usize,
    /// Use the model to classify questions for cache keys; rules otherwise
    #[serde(default = "default_true")]
    pub llm_normalizer: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Sessions kept at once; least used ones are dropped beyond this
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
    /// Seconds a session may stay unused before it is forgotten
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_primary_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_fallback_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_fallback_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_database_url() -> String {
    "sqlite://data/agenda.db".to_string()
}

fn default_table() -> String {
    "contacts".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_rows() -> u32 {
    200
}

fn default_preview_names() -> u32 {
    20
}

fn default_preview_rows() -> u32 {
    3
}

fn default_max_refinements() -> u32 {
    2
}

fn default_ambiguity_threshold() -> usize {
    5
}

fn default_max_rows_in_prompt() -> usize {
    50
}

fn default_max_history() -> usize {
    10
}

fn default_max_sessions() -> u64 {
    10_000
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            base_url: None,
            api_key_env: default_api_key_env(),
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_tokens(),
            fallback_max_output_tokens: default_fallback_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: Some(self.max_output_tokens),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            table: default_table(),
            max_connections: default_max_connections(),
            max_rows: default_max_rows(),
            preview_names: default_preview_names(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_refinements: default_max_refinements(),
            ambiguity_threshold: default_ambiguity_threshold(),
            max_rows_in_prompt: default_max_rows_in_prompt(),
            llm_normalizer: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_timeout_secs.max(1))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("AGENDA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_configuration_is_valid() {
        let config: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.provider, LlmProviderKind::Gemini);
        assert_eq!(config.llm.primary_model, "gemini-2.0-flash");
        assert_eq!(config.llm.fallback_model, "gemini-1.5-flash");
        assert_eq!(config.pipeline.max_refinements, 2);
        assert_eq!(config.pipeline.max_rows_in_prompt, 50);
        assert_eq!(config.session.max_history, 10);
        assert_eq!(config.session.max_sessions, 10_000);
        assert_eq!(config.session.idle_timeout().as_secs(), 1800);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_generation_options_from_llm_config() {
        let options = LlmConfig::default().generation_options();
        assert_eq!(options.temperature, 0.2);
        assert_eq!(options.top_p, 0.95);
        assert_eq!(options.top_k, 40);
        assert_eq!(options.max_output_tokens, Some(2048));
    }

    #[test]
    fn test_partial_override() {
        let config: AppConfig = config::Config::builder()
            .set_override("llm.provider", "openai")
            .unwrap()
            .set_override("cache.max_size", 50)
            .unwrap()
            .set_override("logging.format", "json")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.llm.provider, LlmProviderKind::Openai);
        assert_eq!(config.cache.max_size, 50);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.store.table, "contacts");
    }
}

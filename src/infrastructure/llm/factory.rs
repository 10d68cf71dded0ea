use std::sync::Arc;

use super::http_client::HttpClient;
use super::{FallbackLlmGateway, GeminiProvider, OpenAiProvider};
use crate::config::{LlmConfig, LlmProviderKind};
use crate::domain::{DomainError, LlmGateway, LlmProvider, LlmTarget};

/// Factory for creating LLM providers and the fallback gateway in front of them
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create a provider from configuration, reading the API key from the
    /// environment variable named in the config
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            DomainError::configuration(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        Self::create_with_key(config, api_key)
    }

    /// Create a provider with an explicit API key
    pub fn create_with_key(
        config: &LlmConfig,
        api_key: impl Into<String>,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DomainError::configuration("LLM API key is empty"));
        }

        // Per-call deadlines are enforced by the gateway; this is a backstop.
        let http_client = HttpClient::with_timeout(config.timeout() * 2)?;

        let provider: Arc<dyn LlmProvider> = match (config.provider, &config.base_url) {
            (LlmProviderKind::Gemini, Some(base_url)) => Arc::new(GeminiProvider::with_base_url(
                http_client,
                api_key,
                base_url.as_str(),
            )),
            (LlmProviderKind::Gemini, None) => Arc::new(GeminiProvider::new(http_client, api_key)),
            (LlmProviderKind::Openai, Some(base_url)) => Arc::new(OpenAiProvider::with_base_url(
                http_client,
                api_key,
                base_url.as_str(),
            )),
            (LlmProviderKind::Openai, None) => Arc::new(OpenAiProvider::new(http_client, api_key)),
        };

        Ok(provider)
    }

    /// Primary then fallback model, each with its own output ceiling
    pub fn targets(config: &LlmConfig) -> Vec<LlmTarget> {
        let mut targets = vec![
            LlmTarget::new(&config.primary_model).with_max_output_tokens(config.max_output_tokens),
        ];

        if !config.fallback_model.is_empty() && config.fallback_model != config.primary_model {
            targets.push(
                LlmTarget::new(&config.fallback_model)
                    .with_max_output_tokens(config.fallback_max_output_tokens),
            );
        }

        targets
    }

    /// Wrap a provider in the fallback gateway described by the config
    pub fn create_gateway(
        config: &LlmConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Arc<dyn LlmGateway>, DomainError> {
        let gateway = FallbackLlmGateway::new(provider, Self::targets(config))?
            .with_call_timeout(config.timeout());

        Ok(Arc::new(gateway))
    }
}

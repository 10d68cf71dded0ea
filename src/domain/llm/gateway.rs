use async_trait::async_trait;
use std::fmt::Debug;

use super::{GenerationOptions, extract_structured_payload};
use crate::domain::DomainError;

/// One model reachable through a provider, with an optional output ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmTarget {
    pub model: String,
    pub max_output_tokens: Option<u32>,
}

impl LlmTarget {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

/// Text generation behind a single call, hiding model selection and fallback
#[async_trait]
pub trait LlmGateway: Send + Sync + Debug {
    /// Generate text for a prompt. Fails with [`DomainError::Generation`]
    /// once every configured model has failed.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, DomainError>;

    /// Generate text and decode it as JSON.
    ///
    /// Implementations with more than one model should retry unparsable
    /// output on the next model before giving up with [`DomainError::Parse`].
    async fn generate_structured(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<serde_json::Value, DomainError> {
        let text = self.generate(prompt, options).await?;
        extract_structured_payload(&text)
    }
}

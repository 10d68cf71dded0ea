use serde::{Deserialize, Serialize};

use super::Message;

/// Sampling options applied to a single generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: None,
        }
    }
}

impl GenerationOptions {
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Cap the output budget, keeping the smaller of the two limits
    pub fn capped_at(mut self, ceiling: u32) -> Self {
        self.max_output_tokens = Some(
            self.max_output_tokens
                .map_or(ceiling, |tokens| tokens.min(ceiling)),
        );
        self
    }
}

/// A provider-neutral generation call. Providers map the sampling fields
/// they support and ignore the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl LlmRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Single user turn, no sampling overrides
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    /// Single user turn carrying the given sampling options
    pub fn from_prompt(text: impl Into<String>, options: &GenerationOptions) -> Self {
        Self::prompt(text).with_options(options)
    }

    /// Put a system instruction ahead of the conversation
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.messages.insert(0, Message::system(instruction));
        self
    }

    pub fn with_options(self, options: &GenerationOptions) -> Self {
        Self {
            temperature: Some(options.temperature),
            top_p: Some(options.top_p),
            top_k: Some(options.top_k),
            max_tokens: options.max_output_tokens,
            ..self
        }
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }
}

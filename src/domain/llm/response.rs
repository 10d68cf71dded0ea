use serde::{Deserialize, Serialize};

use super::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A provider's reply, reduced to the assistant text and its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub id: String,
    pub model: String,
    pub message: Message,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl LlmResponse {
    pub fn new(id: impl Into<String>, model: impl Into<String>, message: Message) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            message,
            finish_reason: None,
            usage: None,
        }
    }

    pub fn with_finish_reason(self, reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..self
        }
    }

    pub fn with_usage(self, usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }

    pub fn content(&self) -> &str {
        self.message.content_text()
    }

    /// The provider filtered the output; the text, if any, is unusable
    pub fn is_blocked(&self) -> bool {
        matches!(self.finish_reason, Some(FinishReason::ContentFilter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_total() {
        assert_eq!(Usage::new(12, 30).total_tokens, 42);
    }

    #[test]
    fn test_only_content_filter_counts_as_blocked() {
        let reply = LlmResponse::new("r1", "gemini-2.0-flash", Message::assistant("Hola"));
        assert_eq!(reply.content(), "Hola");
        assert!(!reply.is_blocked());
        assert!(!reply.clone().with_finish_reason(FinishReason::Length).is_blocked());
        assert!(reply.with_finish_reason(FinishReason::ContentFilter).is_blocked());
    }
}

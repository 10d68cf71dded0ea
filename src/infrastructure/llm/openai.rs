use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, Usage,
};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Chat completions provider for OpenAI and compatible servers
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    bearer: String,
    endpoint: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            bearer: format!("Bearer {}", api_key.into()),
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let body = serde_json::to_value(CompletionBody::new(model, &request))
            .map_err(|e| DomainError::internal(format!("Unserializable request: {}", e)))?;

        let raw = self
            .client
            .post_json(
                &self.endpoint,
                vec![
                    ("Authorization", self.bearer.as_str()),
                    ("Content-Type", "application/json"),
                ],
                &body,
            )
            .await?;

        let completion: Completion = serde_json::from_value(raw).map_err(|e| {
            DomainError::generation(model, format!("Unexpected completion shape: {}", e))
        })?;
        completion.into_response(model)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Request body; top_k has no chat completions counterpart and is dropped
#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> CompletionBody<'a> {
    fn new(model: &'a str, request: &'a LlmRequest) -> Self {
        Self {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: m.content_text(),
                })
                .collect(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            stop: request.stop.as_deref(),
        }
    }
}

#[derive(Deserialize)]
struct Completion {
    id: String,
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<CompletionUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl Completion {
    fn into_response(self, requested_model: &str) -> Result<LlmResponse, DomainError> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(DomainError::generation(requested_model, "Completion had no choices"));
        };

        let text = choice.message.content.unwrap_or_default();
        let mut response = LlmResponse::new(self.id, self.model, Message::assistant(text));

        if let Some(reason) = choice.finish_reason.as_deref() {
            response = response.with_finish_reason(match reason {
                "length" => FinishReason::Length,
                "content_filter" => FinishReason::ContentFilter,
                _ => FinishReason::Stop,
            });
        }
        if let Some(usage) = self.usage {
            response = response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GenerationOptions;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

    fn completion(content: &str, finish_reason: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {"role": "assistant", "content": content},
                "finish_reason": finish_reason
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18}
        })
    }

    #[tokio::test]
    async fn test_completion_maps_to_response() {
        let client =
            MockHttpClient::new().with_response(ENDPOINT, completion("Luis Pérez es docente.", "stop"));
        let provider = OpenAiProvider::new(client, "test-api-key");

        let response = provider
            .chat("gpt-4o-mini", LlmRequest::prompt("¿Quién es Luis Pérez?"))
            .await
            .unwrap();

        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.content(), "Luis Pérez es docente.");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 18);
    }

    #[tokio::test]
    async fn test_body_carries_sampling_but_not_top_k() {
        let client = MockHttpClient::new().with_response(ENDPOINT, completion("ok", "length"));
        let provider = OpenAiProvider::new(client, "k");

        let options = GenerationOptions::default().with_max_output_tokens(1024);
        let request = LlmRequest::from_prompt("hola", &options).with_system("Eres un asistente");
        let response = provider.chat("gpt-4o-mini", request).await.unwrap();
        assert_eq!(response.finish_reason, Some(FinishReason::Length));

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("top_k").is_none());
        assert!(body.get("stop").is_none());
    }

    #[tokio::test]
    async fn test_empty_choices_is_generation_error() {
        let client = MockHttpClient::new().with_response(
            ENDPOINT,
            serde_json::json!({"id": "x", "model": "gpt-4o-mini", "choices": []}),
        );
        let provider = OpenAiProvider::new(client, "k");

        let result = provider.chat("gpt-4o-mini", LlmRequest::prompt("Hola")).await;
        assert!(matches!(result, Err(DomainError::Generation { .. })));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = MockHttpClient::new().with_error(ENDPOINT, "API key invalid");
        let provider = OpenAiProvider::new(client, "invalid-key");

        let result = provider.chat("gpt-4o-mini", LlmRequest::prompt("Hola")).await;
        assert!(matches!(result, Err(DomainError::Generation { .. })));
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_trimmed() {
        let client = MockHttpClient::new().with_response(
            "http://localhost:8080/v1/chat/completions",
            completion("Custom", "stop"),
        );
        let provider = OpenAiProvider::with_base_url(client, "test-key", "http://localhost:8080/");

        let response = provider.chat("local", LlmRequest::prompt("Test")).await.unwrap();
        assert_eq!(response.content(), "Custom");
    }
}

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::{
    DomainError, GenerationOptions, LlmGateway, LlmProvider, LlmRequest, LlmTarget,
    extract_structured_payload,
};
use crate::infrastructure::observability::{record_fallback, record_llm_call};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway that walks an ordered list of models until one answers.
///
/// Every call gets its own timeout; expiry, transport errors, blocked output
/// and empty output all count as that model's failure.
#[derive(Debug)]
pub struct FallbackLlmGateway {
    provider: Arc<dyn LlmProvider>,
    targets: Vec<LlmTarget>,
    call_timeout: Duration,
}

impl FallbackLlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, targets: Vec<LlmTarget>) -> Result<Self, DomainError> {
        if targets.is_empty() {
            return Err(DomainError::configuration(
                "At least one model must be configured",
            ));
        }

        Ok(Self {
            provider,
            targets,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn targets(&self) -> &[LlmTarget] {
        &self.targets
    }

    async fn call_target(
        &self,
        target: &LlmTarget,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, DomainError> {
        let options = match target.max_output_tokens {
            Some(ceiling) => options.capped_at(ceiling),
            None => *options,
        };
        let request = LlmRequest::from_prompt(prompt, &options);

        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.call_timeout,
            self.provider.chat(&target.model, request),
        )
        .await;

        let result = match outcome {
            Err(_) => Err(DomainError::generation(
                &target.model,
                format!("timed out after {}s", self.call_timeout.as_secs_f32()),
            )),
            Ok(Err(e)) => Err(e),
            Ok(Ok(response)) if response.is_blocked() => Err(DomainError::generation(
                &target.model,
                "response blocked by content filter",
            )),
            Ok(Ok(response)) if response.content().trim().is_empty() => Err(
                DomainError::generation(&target.model, "empty response"),
            ),
            Ok(Ok(response)) => Ok(response.content().trim().to_string()),
        };

        record_llm_call(&target.model, result.is_ok(), start.elapsed());
        result
    }

    /// Try each target in turn, handing the raw text to `accept`. A target
    /// fails over when the call fails or `accept` rejects its output.
    async fn walk_targets<T, F>(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        accept: F,
    ) -> Result<T, DomainError>
    where
        T: Send,
        F: Fn(&str) -> Result<T, DomainError> + Send + Sync,
    {
        let mut last_error = None;

        for (index, target) in self.targets.iter().enumerate() {
            if index > 0 {
                let previous = &self.targets[index - 1].model;
                warn!(from = %previous, to = %target.model, "Falling back to secondary model");
                record_fallback(previous, &target.model);
            }

            let attempt = match self.call_target(target, prompt, options).await {
                Ok(text) => accept(&text),
                Err(e) => Err(e),
            };

            match attempt {
                Ok(value) => {
                    debug!(model = %target.model, "LLM call succeeded");
                    return Ok(value);
                }
                Err(e) if e.is_retryable_with_fallback() => {
                    warn!(model = %target.model, error = %e, "LLM call failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DomainError::generation("none", "No model produced a response")
        }))
    }
}

#[async_trait]
impl LlmGateway for FallbackLlmGateway {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, DomainError> {
        self.walk_targets(prompt, options, |text| Ok(text.to_string()))
            .await
            .map_err(|e| match e {
                DomainError::Generation { .. } => e,
                other => DomainError::generation("all", other.to_string()),
            })
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<serde_json::Value, DomainError> {
        self.walk_targets(prompt, options, extract_structured_payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockLlmProvider;
    use crate::domain::LlmResponse;
    use std::sync::Mutex;

    fn targets() -> Vec<LlmTarget> {
        vec![
            LlmTarget::new("primary").with_max_output_tokens(2048),
            LlmTarget::new("fallback").with_max_output_tokens(1024),
        ]
    }

    /// Provider whose answer depends on the model being asked
    #[derive(Debug, Default)]
    struct PerModelProvider {
        answers: Vec<(&'static str, Result<&'static str, &'static str>)>,
        seen: Mutex<Vec<(String, Option<u32>)>>,
    }

    #[async_trait]
    impl LlmProvider for PerModelProvider {
        async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
            self.seen
                .lock()
                .unwrap()
                .push((model.to_string(), request.max_tokens));

            match self.answers.iter().find(|(m, _)| *m == model) {
                Some((_, Ok(text))) => Ok(LlmResponse::new(
                    "id".to_string(),
                    model.to_string(),
                    crate::domain::Message::assistant(*text),
                )),
                Some((_, Err(message))) => Err(DomainError::generation(model, *message)),
                None => Err(DomainError::generation(model, "unknown model")),
            }
        }

        fn provider_name(&self) -> &'static str {
            "per-model"
        }
    }

    #[tokio::test]
    async fn test_primary_success_uses_single_call() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("hola"));
        let gateway = FallbackLlmGateway::new(provider.clone(), targets()).unwrap();

        let text = gateway
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(text, "hola");
        assert_eq!(provider.call_count(), 1);
        let (model, request) = provider.last_request().unwrap();
        assert_eq!(model, "primary");
        assert_eq!(request.max_tokens, Some(2048));
        assert_eq!(request.top_k, Some(40));
    }

    #[tokio::test]
    async fn test_falls_back_with_smaller_budget() {
        let provider = Arc::new(PerModelProvider {
            answers: vec![("primary", Err("quota")), ("fallback", Ok("respuesta"))],
            ..Default::default()
        });
        let gateway = FallbackLlmGateway::new(provider.clone(), targets()).unwrap();

        let text = gateway
            .generate("prompt", &GenerationOptions::default().with_max_output_tokens(4096))
            .await
            .unwrap();

        assert_eq!(text, "respuesta");
        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("primary".to_string(), Some(2048)),
                ("fallback".to_string(), Some(1024))
            ]
        );
    }

    #[tokio::test]
    async fn test_all_models_fail() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_error("unavailable"));
        let gateway = FallbackLlmGateway::new(provider.clone(), targets()).unwrap();

        let err = gateway
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Generation { ref model, .. } if model == "fallback"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let provider = Arc::new(
            MockLlmProvider::new("slow")
                .with_response("tarde")
                .with_delay(Duration::from_millis(200)),
        );
        let gateway = FallbackLlmGateway::new(provider.clone(), targets())
            .unwrap()
            .with_call_timeout(Duration::from_millis(20));

        let err = gateway
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_structured_output_retries_on_fallback() {
        let provider = Arc::new(PerModelProvider {
            answers: vec![
                ("primary", Ok("no es json")),
                ("fallback", Ok("```json\n{\"kind\": \"person\"}\n```")),
            ],
            ..Default::default()
        });
        let gateway = FallbackLlmGateway::new(provider.clone(), targets()).unwrap();

        let value = gateway
            .generate_structured("prompt", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(value["kind"], "person");
        assert_eq!(provider.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_structured_output_parse_error_after_fallback() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response("sin estructura"));
        let gateway = FallbackLlmGateway::new(provider, targets()).unwrap();

        let err = gateway
            .generate_structured("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Parse { .. }));
    }

    #[test]
    fn test_requires_a_target() {
        let provider = Arc::new(MockLlmProvider::new("mock"));
        assert!(FallbackLlmGateway::new(provider, vec![]).is_err());
    }
}

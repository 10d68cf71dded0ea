//! LLM provider implementations and the fallback gateway

mod factory;
mod gateway;
mod gemini;
mod http_client;
mod openai;

pub use factory::LlmProviderFactory;
pub use gateway::FallbackLlmGateway;
pub use gemini::GeminiProvider;
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;

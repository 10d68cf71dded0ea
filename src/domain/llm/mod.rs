//! LLM domain models and traits

mod gateway;
mod message;
mod payload;
mod provider;
mod request;
mod response;

pub use gateway::{LlmGateway, LlmTarget};
pub use message::{Message, MessageRole};
pub use payload::extract_structured_payload;
pub use provider::LlmProvider;
pub use request::{GenerationOptions, LlmRequest};
pub use response::{FinishReason, LlmResponse, Usage};

#[cfg(test)]
pub use gateway::mock::ScriptedLlmGateway;
#[cfg(test)]
pub use provider::mock::MockLlmProvider;

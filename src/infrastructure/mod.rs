//! Infrastructure layer - External service implementations

pub mod llm;
pub mod logging;
pub mod normalizer;
pub mod observability;
pub mod search;
pub mod semantic_cache;
pub mod services;
pub mod store;

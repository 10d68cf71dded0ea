//! Domain layer - Core business logic and entities

pub mod error;
pub mod llm;
pub mod search;
pub mod semantic_cache;
pub mod semantic_key;
pub mod session;

pub use error::DomainError;
pub use llm::{
    extract_structured_payload, FinishReason, GenerationOptions, LlmGateway, LlmProvider,
    LlmRequest, LlmResponse, LlmTarget, Message, MessageRole, Usage,
};
pub use search::{
    Column, ContactStore, Evaluation, Filter, MatchMode, NameReference, QueryBuilder, QuerySpec,
    ResultSet, StorePreview, Strategy,
};
pub use semantic_cache::{CacheEntry, CacheSnapshot, CacheStats, SemanticCache, SemanticCacheConfig};
pub use semantic_key::{
    Attribute, Classification, EntityMention, KnownPerson, NameLexicon, QueryClassifier,
    QueryKind, SemanticKey,
};
pub use session::SessionContext;

#[cfg(test)]
pub use llm::{MockLlmProvider, ScriptedLlmGateway};
#[cfg(test)]
pub use search::MockContactStore;

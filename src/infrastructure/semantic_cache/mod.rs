//! Semantic cache implementations

mod in_memory;
mod persistence;

pub use in_memory::InMemorySemanticCache;
pub use persistence::CachePersistence;

//! Semantic cache domain models and traits
//!
//! Answers are cached by semantic key, so lexically different questions
//! about the same thing share one entry.

mod cache;
mod config;
mod entry;

pub use cache::SemanticCache;
pub use config::SemanticCacheConfig;
pub use entry::{CacheEntry, CacheSnapshot, CacheStats, SnapshotEntry, SnapshotMetadata};

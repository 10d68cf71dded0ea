//! Semantic cache trait

use std::fmt::Debug;

use super::{CacheSnapshot, CacheStats};
use crate::domain::semantic_key::SemanticKey;

/// Bounded key-to-answer store placed in front of the pipeline.
///
/// Operations are synchronous, never fail and never wait on external I/O.
pub trait SemanticCache: Send + Sync + Debug {
    /// Look up an answer, counting exactly one hit or one miss
    fn get(&self, key: &SemanticKey) -> Option<String>;

    /// Insert or overwrite. A new key at capacity evicts the oldest insertion.
    fn put(&self, key: SemanticKey, answer: String);

    /// Drop every entry, keeping statistics
    fn clear(&self);

    fn reset_stats(&self);

    fn stats(&self) -> CacheStats;

    fn size(&self) -> usize;

    fn max_size(&self) -> usize;

    /// Entries and counters in persistable form
    fn snapshot(&self) -> CacheSnapshot;

    /// Replace contents with a snapshot, keeping the newest entries that fit
    fn restore(&self, snapshot: CacheSnapshot);
}

//! Cache entries, statistics and the persisted snapshot

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::semantic_key::SemanticKey;

/// A cached answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: SemanticKey,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: SemanticKey, answer: impl Into<String>) -> Self {
        Self {
            key,
            answer: answer.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Point-in-time view of cache accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub max_size: usize,
    pub evictions: u64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: usize, max_size: usize, evictions: u64) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        Self {
            hits,
            misses,
            hit_rate,
            size,
            max_size,
            evictions,
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Stored answer inside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// Counters carried across restarts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default)]
    pub hits: u64,
    #[serde(default)]
    pub misses: u64,
    #[serde(default)]
    pub evictions: u64,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// On-disk form of the cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub metadata: SnapshotMetadata,
    #[serde(default)]
    pub entries: BTreeMap<SemanticKey, SnapshotEntry>,
}

impl CacheSnapshot {
    /// Entries ordered oldest first, keeping only the newest `max_size`
    pub fn newest_entries(&self, max_size: usize) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|(key, stored)| {
                CacheEntry::new(key.clone(), stored.answer.clone())
                    .with_created_at(stored.created_at)
            })
            .collect();

        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key.cmp(&b.key)));

        let skip = entries.len().saturating_sub(max_size);
        entries.into_iter().skip(skip).collect()
    }
}

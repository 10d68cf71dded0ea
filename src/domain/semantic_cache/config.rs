//! Semantic cache configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the semantic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// When disabled every question runs the full pipeline
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of cached answers
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Entry time-to-live in seconds; entries never expire when unset
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Where the cache snapshot is saved between runs
    #[serde(default)]
    pub persistence_path: Option<PathBuf>,

    /// Capacity of the normalizer's query-to-key memo
    #[serde(default = "default_memo_capacity")]
    pub memo_capacity: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_max_size() -> usize {
    1000
}

fn default_memo_capacity() -> u64 {
    2048
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_size: default_max_size(),
            ttl_secs: None,
            persistence_path: None,
            memo_capacity: default_memo_capacity(),
        }
    }
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    pub fn with_persistence_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence_path = Some(path.into());
        self
    }
}

//! In-memory semantic cache with FIFO eviction

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use crate::domain::semantic_cache::{
    CacheEntry, CacheSnapshot, CacheStats, SemanticCache, SemanticCacheConfig, SnapshotEntry,
    SnapshotMetadata,
};
use crate::domain::SemanticKey;
use crate::infrastructure::observability::{record_cache_eviction, record_cache_lookup};

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<SemanticKey, CacheEntry>,
    /// Insertion order, oldest at the front
    order: VecDeque<SemanticKey>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn remove(&mut self, key: &SemanticKey) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|queued| queued != key);
        }
    }
}

/// Bounded in-memory cache guarded by a single mutex.
///
/// Eviction is by insertion order, not access. Overwriting a key keeps its
/// place in the queue.
#[derive(Debug)]
pub struct InMemorySemanticCache {
    state: Mutex<CacheState>,
    max_size: usize,
    ttl: Option<Duration>,
}

impl InMemorySemanticCache {
    /// Capacity is fixed here; a zero capacity is raised to one
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_size: max_size.max(1),
            ttl: None,
        }
    }

    pub fn from_config(config: &SemanticCacheConfig) -> Self {
        let cache = Self::new(config.max_size);
        match config.ttl() {
            Some(ttl) => cache.with_ttl(ttl),
            None => cache,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // No update spans a panic point, so a poisoned state is still whole
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        match self.ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()) {
            Some(ttl) => entry.created_at + ttl <= Utc::now(),
            None => false,
        }
    }
}

impl SemanticCache for InMemorySemanticCache {
    fn get(&self, key: &SemanticKey) -> Option<String> {
        let mut state = self.lock();

        let lookup = state
            .entries
            .get(key)
            .map(|entry| (self.is_expired(entry), entry.answer.clone()));

        match lookup {
            Some((false, answer)) => {
                state.hits += 1;
                record_cache_lookup(true);
                return Some(answer);
            }
            Some((true, _)) => state.remove(key),
            None => {}
        }

        state.misses += 1;
        record_cache_lookup(false);
        None
    }

    fn put(&self, key: SemanticKey, answer: String) {
        let mut state = self.lock();

        if let Some(existing) = state.entries.get_mut(&key) {
            existing.answer = answer;
            return;
        }

        while state.entries.len() >= self.max_size {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            state.evictions += 1;
            record_cache_eviction();
            tracing::debug!(key = %oldest, "Evicted oldest cache entry");
        }

        state.order.push_back(key.clone());
        state.entries.insert(key.clone(), CacheEntry::new(key, answer));
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    fn reset_stats(&self) {
        let mut state = self.lock();
        state.hits = 0;
        state.misses = 0;
        state.evictions = 0;
    }

    fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats::new(
            state.hits,
            state.misses,
            state.entries.len(),
            self.max_size,
            state.evictions,
        )
    }

    fn size(&self) -> usize {
        self.lock().entries.len()
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    fn snapshot(&self) -> CacheSnapshot {
        let state = self.lock();

        CacheSnapshot {
            metadata: SnapshotMetadata {
                hits: state.hits,
                misses: state.misses,
                evictions: state.evictions,
                saved_at: Some(Utc::now()),
            },
            entries: state
                .entries
                .values()
                .map(|entry| {
                    (
                        entry.key.clone(),
                        SnapshotEntry {
                            answer: entry.answer.clone(),
                            created_at: entry.created_at,
                        },
                    )
                })
                .collect(),
        }
    }

    fn restore(&self, snapshot: CacheSnapshot) {
        let entries = snapshot.newest_entries(self.max_size);
        let mut state = self.lock();

        state.entries.clear();
        state.order.clear();
        for entry in entries {
            if self.is_expired(&entry) {
                continue;
            }
            state.order.push_back(entry.key.clone());
            state.entries.insert(entry.key.clone(), entry);
        }

        state.hits = snapshot.metadata.hits;
        state.misses = snapshot.metadata.misses;
        state.evictions = snapshot.metadata.evictions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueryKind;
    use std::sync::Arc;

    fn key(name: &str) -> SemanticKey {
        SemanticKey::new(QueryKind::Person, name, "phone")
    }

    #[test]
    fn test_put_then_get() {
        let cache = InMemorySemanticCache::new(10);
        cache.put(key("luis_perez"), "618-555-0101".to_string());

        assert_eq!(cache.get(&key("luis_perez")).as_deref(), Some("618-555-0101"));
        assert_eq!(cache.get(&key("ana_lopez")), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let cache = InMemorySemanticCache::new(3);
        for name in ["a", "b", "c", "d"] {
            cache.put(key(name), name.to_string());
        }

        assert_eq!(cache.size(), 3);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.get(&key("a")), None);
        assert!(cache.get(&key("d")).is_some());
    }

    #[test]
    fn test_eviction_ignores_access_order() {
        let cache = InMemorySemanticCache::new(2);
        cache.put(key("a"), "1".to_string());
        cache.put(key("b"), "2".to_string());
        cache.get(&key("a"));
        cache.put(key("c"), "3".to_string());

        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")).as_deref(), Some("2"));
    }

    #[test]
    fn test_overwrite_keeps_position_and_is_not_eviction() {
        let cache = InMemorySemanticCache::new(2);
        cache.put(key("a"), "1".to_string());
        cache.put(key("b"), "2".to_string());
        cache.put(key("a"), "1b".to_string());

        assert_eq!(cache.size(), 2);
        assert_eq!(cache.stats().evictions, 0);

        cache.put(key("c"), "3".to_string());
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")).as_deref(), Some("2"));
    }

    #[test]
    fn test_clear_keeps_stats_and_is_idempotent() {
        let cache = InMemorySemanticCache::new(5);
        cache.put(key("a"), "1".to_string());
        cache.get(&key("a"));

        cache.clear();
        cache.clear();
        assert_eq!(cache.get(&key("a")), None);

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        cache.reset_stats();
        assert_eq!(cache.stats(), CacheStats::new(0, 0, 0, 5, 0));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = InMemorySemanticCache::new(5).with_ttl(Duration::ZERO);
        cache.put(key("a"), "1".to_string());

        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_snapshot_restore_keeps_newest() {
        let source = InMemorySemanticCache::new(5);
        for name in ["a", "b", "c"] {
            source.put(key(name), name.to_string());
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        source.get(&key("a"));
        source.get(&key("zzz"));

        let target = InMemorySemanticCache::new(2);
        target.restore(source.snapshot());

        assert_eq!(target.size(), 2);
        let stats = target.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(target.get(&key("a")), None);
        assert_eq!(target.get(&key("c")).as_deref(), Some("c"));
    }

    #[test]
    fn test_size_never_exceeds_capacity_under_concurrency() {
        let cache = Arc::new(InMemorySemanticCache::new(8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.put(key(&format!("t{t}_{i}")), i.to_string());
                        assert!(cache.size() <= 8);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.size(), 8);
    }
}

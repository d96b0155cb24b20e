//! Bounded memoization cache for built insights.
//!
//! Keyed by a SHA-256 content hash of (record identity, serialized raw payload),
//! so an identical payload always maps to the same entry and any change in the
//! payload maps to a new one. Eviction is insertion-order (oldest first), not LRU:
//! a hit does not refresh an entry's position.

use super::types::Insight;
use anyhow::Context;
use metrics::counter;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// Default capacity ceiling.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct InsightCache {
    capacity: usize,
    entries: HashMap<String, Insight>,
    /// Keys in insertion order; front is the oldest.
    order: VecDeque<String>,
    stats: CacheStats,
}

impl Default for InsightCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl InsightCache {
    /// `capacity` 0 is treated as 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Content hash of (identity, payload) as lowercase hex.
    pub fn key(identity: &str, raw_payload: &Value) -> anyhow::Result<String> {
        use sha2::{Digest, Sha256};
        let payload =
            serde_json::to_string(raw_payload).context("serializing payload for cache key")?;
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        hasher.update([0x1f]);
        hasher.update(payload.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        Ok(out)
    }

    /// Return the cached insight for `key`, or build, store and return it.
    ///
    /// `build` runs only on a miss. A build that yields `None` (degenerate record)
    /// stores nothing, so the next run re-checks it.
    pub fn get_or_build<F>(&mut self, key: &str, build: F) -> Option<Insight>
    where
        F: FnOnce() -> Option<Insight>,
    {
        if let Some(hit) = self.entries.get(key) {
            self.stats.hits += 1;
            counter!("insight_cache_hits_total").increment(1);
            return Some(hit.clone());
        }

        self.stats.misses += 1;
        counter!("insight_cache_misses_total").increment(1);

        let built = build()?;
        self.insert(key.to_string(), built.clone());
        Some(built)
    }

    fn insert(&mut self, key: String, insight: Insight) {
        // Evict before inserting so the store never exceeds the ceiling.
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.stats.evictions += 1;
                    counter!("insight_cache_evictions_total").increment(1);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, insight);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::types::{Category, Section};
    use serde_json::json;

    fn insight(id: &str) -> Insight {
        Insight {
            id: id.to_string(),
            category: Category::Trends,
            section: Section::Trends,
            title: "Title".into(),
            description: "Title".into(),
            confidence: 0.7,
            is_time_sensitive: true,
            evidence: vec![],
            sources: vec![],
            raw_payload: json!({"trend": id}),
        }
    }

    #[test]
    fn key_depends_on_identity_and_payload() {
        let a = InsightCache::key("trend-0", &json!({"trend": "x"})).unwrap();
        let b = InsightCache::key("trend-0", &json!({"trend": "x"})).unwrap();
        let c = InsightCache::key("trend-1", &json!({"trend": "x"})).unwrap();
        let d = InsightCache::key("trend-0", &json!({"trend": "y"})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hit_skips_build() {
        let mut cache = InsightCache::with_capacity(4);
        let mut builds = 0;
        let first = cache.get_or_build("k", || {
            builds += 1;
            Some(insight("a"))
        });
        let second = cache.get_or_build("k", || {
            builds += 1;
            Some(insight("other"))
        });
        assert_eq!(builds, 1);
        assert_eq!(first, second);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn evicts_oldest_inserted_when_full() {
        let mut cache = InsightCache::with_capacity(2);
        cache.get_or_build("a", || Some(insight("a")));
        cache.get_or_build("b", || Some(insight("b")));
        // a hit does not refresh "a"
        cache.get_or_build("a", || None);
        cache.get_or_build("c", || Some(insight("c")));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn degenerate_builds_are_not_stored() {
        let mut cache = InsightCache::default();
        assert!(cache.get_or_build("k", || None).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), DEFAULT_CACHE_CAPACITY);
    }
}

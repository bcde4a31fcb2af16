//! Query Embedding Cache
//!
//! Users tend to ask the same handful of questions, so query embeddings are
//! kept in a bounded LRU map. Keys are SHA-256 hashes of `text + model_name`,
//! so switching models never returns a stale vector.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Compute the cache key for `text` embedded by `model`
pub fn compute_key(text: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Bounded in-memory LRU cache for embeddings
pub struct LruEmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruEmbeddingCache {
    /// Returns `None` for a zero capacity, which callers treat as "no cache".
    pub fn new(capacity: usize) -> Option<Self> {
        let cap = NonZeroUsize::new(capacity)?;
        Some(Self {
            cache: Mutex::new(LruCache::new(cap)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let found = self.cache.lock().get(key).cloned();
        match found {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: String, embedding: Vec<f32>) {
        self.cache.lock().put(key, embedding);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_model() {
        let a = compute_key("who is the hod", "hash-384");
        let b = compute_key("who is the hod", "nomic-embed-text");
        assert_ne!(a, b);
        assert_eq!(a, compute_key("who is the hod", "hash-384"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_zero_capacity_disables() {
        assert!(LruEmbeddingCache::new(0).is_none());
    }

    #[test]
    fn test_hit_and_miss_counting() {
        let cache = LruEmbeddingCache::new(4).unwrap();
        assert!(cache.get("k").is_none());
        cache.set("k".to_string(), vec![1.0, 2.0]);
        assert_eq!(cache.get("k"), Some(vec![1.0, 2.0]));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert!((stats.hit_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LruEmbeddingCache::new(2).unwrap();
        cache.set("a".to_string(), vec![1.0]);
        cache.set("b".to_string(), vec![2.0]);
        assert!(cache.get("a").is_some());
        cache.set("c".to_string(), vec![3.0]);

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }
}

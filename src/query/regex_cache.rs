use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use lru::LruCache;
use parking_lot::RwLock;
use regex::Regex;
use tracing::warn;

/// Bounded shared cache of compiled patterns, consulted by regex predicates
/// and by field-name pattern matching. Guarded by its own lock so pattern
/// reuse never contends with the table lock.
pub struct RegexCache {
    cache: RwLock<LruCache<String, Regex>>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct RegexCacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl RegexCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        RegexCache {
            cache: RwLock::new(LruCache::new(cap)),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    /// Fetch a compiled pattern, compiling and caching on miss. A pattern
    /// that fails to compile is logged and yields None.
    pub fn get(&self, pattern: &str) -> Option<Regex> {
        if let Some(re) = self.cache.write().get(pattern) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Some(re.clone());
        }
        self.miss_count.fetch_add(1, Ordering::Relaxed);

        match Regex::new(pattern) {
            Ok(re) => {
                self.cache.write().put(pattern.to_string(), re.clone());
                Some(re)
            }
            Err(err) => {
                warn!(pattern = %pattern, error = %err, "failed to compile pattern");
                None
            }
        }
    }

    /// Currently cached pattern texts, for persistence.
    pub fn patterns(&self) -> Vec<String> {
        self.cache
            .read()
            .iter()
            .map(|(pattern, _)| pattern.clone())
            .collect()
    }

    /// Recompile and cache patterns up to capacity; uncompilable entries are
    /// skipped. Used when restoring a snapshot.
    pub fn preload(&self, patterns: &[String]) {
        let mut cache = self.cache.write();
        for pattern in patterns {
            if cache.len() >= cache.cap().get() {
                break;
            }
            if let Ok(re) = Regex::new(pattern) {
                cache.put(pattern.clone(), re);
            }
        }
    }

    pub fn resize(&self, capacity: usize) {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        self.cache.write().resize(cap);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn stats(&self) -> RegexCacheStats {
        let cache = self.cache.read();
        RegexCacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: cache.len(),
            capacity: cache.cap().get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_compiled_patterns() {
        let cache = RegexCache::new(10);
        assert!(cache.get("^a.*b$").is_some());
        assert!(cache.get("^a.*b$").is_some());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn invalid_pattern_yields_none() {
        let cache = RegexCache::new(10);
        assert!(cache.get("[unclosed").is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn evicts_at_capacity() {
        let cache = RegexCache::new(2);
        cache.get("a");
        cache.get("b");
        cache.get("c");
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = RegexCache::new(10);
        cache.get("a");
        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }
}

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::models::SynthesisResult;

/// Default freshness window for cached pipeline results.
pub const CACHE_TTL_MINUTES: i64 = 15;

/// Injectable time source, so expiry is testable with a fake clock.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Read-through cache for pipeline results, keyed by caller-chosen strings.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<SynthesisResult>;
    fn set(&self, key: &str, result: SynthesisResult);
}

struct CacheEntry {
    result: SynthesisResult,
    stored_at: DateTime<Utc>,
}

/// In-process cache with a TTL. Expired entries are dropped lazily on read.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Clock,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    /// Uses the given clock instead of the system clock, so expiry can be
    /// tested without sleeping.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(CACHE_TTL_MINUTES),
            clock,
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<SynthesisResult> {
        let now = (self.clock)();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if now - entry.stored_at < self.ttl => {
                debug!(key, "Cache hit");
                Some(entry.result.clone())
            }
            Some(_) => {
                debug!(key, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, result: SynthesisResult) {
        let stored_at = (self.clock)();
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), CacheEntry { result, stored_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PipelineStats;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn sample() -> SynthesisResult {
        SynthesisResult::empty(PipelineStats {
            news_items_fetched: 7,
            ..PipelineStats::default()
        })
    }

    /// Clock whose reading advances only when the test says so.
    fn stepped_clock() -> (Clock, Arc<AtomicI64>) {
        let offset_minutes = Arc::new(AtomicI64::new(0));
        let shared = Arc::clone(&offset_minutes);
        let base = Utc::now();
        let clock: Clock = Arc::new(move || {
            base + Duration::minutes(shared.load(Ordering::SeqCst))
        });
        (clock, offset_minutes)
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = MemoryCache::new();
        cache.set("trends", sample());
        let hit = cache.get("trends").unwrap();
        assert_eq!(hit.pipeline_stats.news_items_fetched, 7);
    }

    #[test]
    fn missing_key_is_a_miss() {
        let cache = MemoryCache::new();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn entries_expire_after_the_ttl() {
        let (clock, offset) = stepped_clock();
        let cache = MemoryCache::with_clock(clock);
        cache.set("trends", sample());

        offset.store(CACHE_TTL_MINUTES - 1, Ordering::SeqCst);
        assert!(cache.get("trends").is_some());

        offset.store(CACHE_TTL_MINUTES, Ordering::SeqCst);
        assert!(cache.get("trends").is_none());
        // Expired entry was evicted, not just hidden.
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn set_refreshes_the_stored_at_time() {
        let (clock, offset) = stepped_clock();
        let cache = MemoryCache::with_clock(clock);
        cache.set("trends", sample());

        offset.store(10, Ordering::SeqCst);
        cache.set("trends", sample());

        offset.store(20, Ordering::SeqCst);
        assert!(cache.get("trends").is_some());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = MemoryCache::new();
        cache.set("a", sample());
        cache.set("b", sample());
        cache.clear();
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
    }
}

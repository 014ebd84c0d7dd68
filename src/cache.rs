//! Bounded TTL+LRU cache shared across all request handlers.
//!
//! One mutex over an [`lru::LruCache`] (the key map and recency list in a
//! single structure); every entry carries an absolute expiry. Reads evict
//! on expiry, writes evict on overflow, and a background janitor sweeps
//! whatever neither path has touched. Critical sections do no I/O.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::models::Item;

/// What a cache slot can hold. `Missing` is the negative-result marker: it
/// records that upstream answered "no such item", which is distinct from
/// the key simply not being cached.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// A hydrated item, shared immutably between requests
    Item(Arc<Item>),
    /// A feed id list
    Ids(Arc<[u64]>),
    /// Upstream said the key does not exist
    Missing,
}

struct CacheEntry {
    value: CacheValue,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe TTL+LRU cache with a fixed entry budget
pub struct TtlLruCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl TtlLruCache {
    /// Create a cache holding at most `max_entries` live entries
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a key, promoting it to most-recently-used on a hit.
    ///
    /// An entry whose expiry has passed is removed on the spot and reported
    /// as a miss; expired values are never returned.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        match inner.get(key) {
            Some(entry) if entry.is_expired(now) => {}
            Some(entry) => return Some(entry.value.clone()),
            None => return None,
        }
        inner.pop(key);
        None
    }

    /// Insert or refresh an entry with the given TTL and promote it.
    ///
    /// A zero TTL is a no-op. When the cache is full the least-recently
    /// used entry is evicted to make room.
    pub fn set(&self, key: impl Into<String>, value: CacheValue, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.inner.lock().put(key.into(), entry);
    }

    /// Number of entries currently held, expired stragglers included
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Remove every entry whose expiry has passed
    pub fn evict_expired(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let expired: Vec<String> = inner
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.pop(key);
        }
        if !expired.is_empty() {
            debug!(swept = expired.len(), "cache janitor swept expired entries");
        }
    }

    /// Spawn the background janitor, sweeping expired entries forever at
    /// the given interval.
    pub fn start_janitor(self: &Arc<Self>, interval: Duration) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                cache.evict_expired();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64) -> CacheValue {
        CacheValue::Item(Arc::new(Item {
            id,
            kind: "story".to_string(),
            ..Item::default()
        }))
    }

    fn item_id(value: &CacheValue) -> u64 {
        match value {
            CacheValue::Item(item) => item.id,
            other => panic!("expected an item, got {other:?}"),
        }
    }

    #[test]
    fn get_returns_fresh_value() {
        let cache = TtlLruCache::new(8);
        cache.set("item:1", item(1), Duration::from_secs(60));
        let hit = cache.get("item:1").expect("fresh entry");
        assert_eq!(item_id(&hit), 1);
    }

    #[test]
    fn get_misses_on_absent_key() {
        let cache = TtlLruCache::new(8);
        assert!(cache.get("item:404").is_none());
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let cache = TtlLruCache::new(8);
        cache.set("item:1", item(1), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("item:1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_is_a_noop() {
        let cache = TtlLruCache::new(8);
        cache.set("item:1", item(1), Duration::ZERO);
        assert!(cache.get("item:1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn set_overwrites_in_place() {
        let cache = TtlLruCache::new(8);
        cache.set("item:1", item(1), Duration::from_secs(60));
        cache.set("item:1", item(99), Duration::from_secs(60));
        assert_eq!(cache.len(), 1);
        assert_eq!(item_id(&cache.get("item:1").unwrap()), 99);
    }

    #[test]
    fn overflow_evicts_least_recently_used() {
        let cache = TtlLruCache::new(2);
        cache.set("a", item(1), Duration::from_secs(60));
        cache.set("b", item(2), Duration::from_secs(60));
        // Touch "a" so "b" becomes the LRU victim.
        cache.get("a");
        cache.set("c", item(3), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let cache = TtlLruCache::new(4);
        for i in 0..64 {
            cache.set(format!("item:{i}"), item(i), Duration::from_secs(60));
            assert!(cache.len() <= 4);
        }
    }

    #[test]
    fn janitor_sweep_removes_only_expired() {
        let cache = TtlLruCache::new(8);
        cache.set("short", item(1), Duration::from_millis(1));
        cache.set("long", item(2), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        cache.evict_expired();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").is_some());
    }

    #[test]
    fn missing_marker_is_distinct_from_absence() {
        let cache = TtlLruCache::new(8);
        assert!(cache.get("item:7").is_none());
        cache.set("item:7", CacheValue::Missing, Duration::from_secs(60));
        assert!(matches!(cache.get("item:7"), Some(CacheValue::Missing)));
    }
}

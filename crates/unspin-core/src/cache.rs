//! Fingerprint-keyed result cache with TTL and a capacity bound.
//!
//! One mutex guards the whole structure, so every operation is
//! linearizable: a `get` racing a `put` sees either the state before or
//! after, never a torn record. Expiry is enforced lazily on read;
//! capacity is enforced eagerly on write by evicting the
//! oldest-inserted live record. Hit counts are observability only and
//! never influence eviction.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use unspin_types::{CacheRecord, CacheStats};

use crate::fingerprint::Fingerprint;

/// Bounded TTL cache of neutralization results.
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    ttl: chrono::Duration,
    capacity: usize,
}

struct CacheInner {
    records: HashMap<Fingerprint, CacheRecord>,
    /// Insertion order; may hold keys whose records already expired.
    order: VecDeque<Fingerprint>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    /// Create a cache with the given TTL and maximum live entry count.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                records: HashMap::new(),
                order: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::MAX),
            capacity: capacity.max(1),
        }
    }

    /// Look up a record, counting the outcome.
    ///
    /// An expired record is removed on the spot and reported as a miss.
    /// A hit increments the record's `hit_count` before returning a
    /// snapshot of it.
    pub fn get(&self, key: &Fingerprint) -> Option<CacheRecord> {
        let mut inner = self.inner.lock();

        let expired = match inner.records.get(key) {
            Some(record) => Utc::now() - record.created_at > self.ttl,
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if expired {
            inner.records.remove(key);
            inner.order.retain(|k| k != key);
            inner.misses += 1;
            debug!(fingerprint = %key, "cache record expired");
            return None;
        }

        inner.hits += 1;
        let record = inner
            .records
            .get_mut(key)
            .map(|record| {
                record.hit_count += 1;
                record.clone()
            });
        record
    }

    /// Insert or refresh a record.
    ///
    /// Refreshing an existing key resets its age and moves it to the
    /// back of the eviction order. When the cache is full, the
    /// oldest-inserted live record is evicted first.
    pub fn put(&self, key: Fingerprint, record: CacheRecord) {
        let mut inner = self.inner.lock();

        if inner.records.remove(&key).is_some() {
            inner.order.retain(|k| k != &key);
        }

        while inner.records.len() >= self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    if inner.records.remove(&oldest).is_some() {
                        debug!(fingerprint = %oldest, "evicted oldest cache record");
                    }
                }
                None => break,
            }
        }

        inner.order.push_back(key);
        inner.records.insert(key, record);
    }

    /// Number of physically present records, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record and reset the hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            total_entries: inner.records.len(),
            cache_hits: inner.hits,
            cache_misses: inner.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResultCache")
            .field("entries", &inner.records.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use unspin_types::Technique;

    fn record_for(text: &str) -> CacheRecord {
        CacheRecord {
            fingerprint: fingerprint(text).to_hex(),
            original: text.into(),
            neutralized: text.to_lowercase(),
            techniques: vec![Technique::MisleadingFormat],
            severity: 2,
            created_at: Utc::now(),
            hit_count: 0,
        }
    }

    fn day_cache(capacity: usize) -> ResultCache {
        ResultCache::new(Duration::from_secs(24 * 3600), capacity)
    }

    #[test]
    fn miss_then_hit() {
        let cache = day_cache(10);
        let key = fingerprint("SOME TEXT!!");

        assert!(cache.get(&key).is_none());
        cache.put(key, record_for("SOME TEXT!!"));

        let record = cache.get(&key).unwrap();
        assert_eq!(record.original, "SOME TEXT!!");
        assert_eq!(record.hit_count, 1);

        let stats = cache.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn hit_count_accumulates() {
        let cache = day_cache(10);
        let key = fingerprint("a");
        cache.put(key, record_for("a"));

        for _ in 0..3 {
            cache.get(&key);
        }
        assert_eq!(cache.get(&key).unwrap().hit_count, 4);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = ResultCache::new(Duration::ZERO, 10);
        let key = fingerprint("ephemeral");
        cache.put(key, record_for("ephemeral"));

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
        // Expired records are physically removed on read.
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().cache_misses, 1);
    }

    #[test]
    fn capacity_evicts_oldest_inserted() {
        let cache = day_cache(3);
        let keys: Vec<Fingerprint> = (0..4)
            .map(|i| fingerprint(&format!("fragment {i}")))
            .collect();

        for (i, key) in keys.iter().enumerate() {
            cache.put(*key, record_for(&format!("fragment {i}")));
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_some());
        assert!(cache.get(&keys[3]).is_some());
    }

    #[test]
    fn refresh_resets_eviction_order() {
        let cache = day_cache(2);
        let a = fingerprint("a");
        let b = fingerprint("b");
        let c = fingerprint("c");

        cache.put(a, record_for("a"));
        cache.put(b, record_for("b"));
        // Re-inserting `a` makes `b` the oldest.
        cache.put(a, record_for("a"));
        cache.put(c, record_for("c"));

        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn refresh_resets_hit_count() {
        let cache = day_cache(10);
        let key = fingerprint("a");
        cache.put(key, record_for("a"));
        cache.get(&key);
        cache.put(key, record_for("a"));
        assert_eq!(cache.get(&key).unwrap().hit_count, 1);
    }

    #[test]
    fn clear_resets_everything() {
        let cache = day_cache(10);
        let key = fingerprint("a");
        cache.put(key, record_for("a"));
        cache.get(&key);
        cache.clear();

        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
    }
}

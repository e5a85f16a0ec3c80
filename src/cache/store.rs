//! Cache Store Module
//!
//! Main cache engine: a read/write locked HashMap of byte payloads plus
//! sweep-based expiry.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Expiry Mode ==
/// Controls whether lookups themselves enforce the cache interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryMode {
    /// Stale entries stay readable until a sweep removes them.
    #[default]
    BestEffort,
    /// `get` also treats entries older than the cache interval as absent.
    Strict,
}

#[derive(Debug, Default)]
struct Shared {
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: StatsRecorder,
}

// == Expiring Cache ==
/// Thread-safe store of opaque byte payloads keyed by string.
///
/// Cloning is cheap and every clone shares the same store, so a single cache
/// can be handed to each part of an application that needs it. The store is
/// freed once the last clone is dropped.
#[derive(Debug, Clone)]
pub struct ExpiringCache {
    shared: Arc<Shared>,
    interval: Duration,
    mode: ExpiryMode,
}

impl ExpiringCache {
    // == Constructor ==
    /// Creates an empty best-effort cache.
    ///
    /// `interval` is nominal: no sweep is started here. Call
    /// [`start_sweep`](Self::start_sweep) to begin expiring entries.
    pub fn new(interval: Duration) -> Self {
        Self::with_mode(interval, ExpiryMode::BestEffort)
    }

    /// Creates an empty cache with the given expiry mode.
    ///
    /// In [`ExpiryMode::Strict`], `interval` is the age after which `get`
    /// stops returning an entry.
    pub fn with_mode(interval: Duration, mode: ExpiryMode) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            interval,
            mode,
        }
    }

    /// Returns the interval the cache was constructed with.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the configured expiry mode.
    pub fn mode(&self) -> ExpiryMode {
        self.mode
    }

    // == Add ==
    /// Inserts or overwrites the entry for `key`, stamped with the current time.
    ///
    /// Overwriting resets the entry's age.
    pub fn add(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let entry = CacheEntry::new(value.into());
        self.shared.entries.write().insert(key.into(), entry);
    }

    // == Get ==
    /// Returns a copy of the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = {
            let entries = self.shared.entries.read();
            entries
                .get(key)
                .filter(|entry| self.is_readable(entry))
                .map(|entry| entry.value.clone())
        };

        match value {
            Some(_) => {
                trace!(key, "cache hit");
                self.shared.stats.record_hit();
            }
            None => {
                trace!(key, "cache miss");
                self.shared.stats.record_miss();
            }
        }
        value
    }

    // == Delete ==
    /// Removes the entry for `key`. Absent keys are ignored.
    pub fn delete(&self, key: &str) {
        if self.shared.entries.write().remove(key).is_some() {
            debug!(key, "deleted");
        }
    }

    // == Contains Key ==
    /// Returns true if `key` is present. Does not affect statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        let entries = self.shared.entries.read();
        entries.get(key).is_some_and(|entry| self.is_readable(entry))
    }

    // == Length ==
    /// Returns the number of stored entries, including unswept stale ones.
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    // == Is Empty ==
    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    ///
    /// Taken under the shared lock, so `total_entries + swept` is consistent
    /// with the sweep counters at that instant.
    pub fn stats(&self) -> CacheStats {
        let entries = self.shared.entries.read();
        self.shared.stats.snapshot(entries.len())
    }

    // == Sweep Expired ==
    /// Removes every entry whose age exceeds `max_age`.
    ///
    /// Stale keys are collected under the shared lock and removed under one
    /// exclusive lock. Each entry is re-checked before removal so a key
    /// re-added in between survives.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let stale: Vec<String> = self
            .shared
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_older_than(max_age))
            .map(|(key, _)| key.clone())
            .collect();

        if stale.is_empty() {
            self.shared.stats.record_sweep(0);
            return 0;
        }

        let mut entries = self.shared.entries.write();
        let removed = stale
            .iter()
            .filter(|key| {
                let still_stale = entries
                    .get(key.as_str())
                    .is_some_and(|entry| entry.is_older_than(max_age));
                if still_stale {
                    entries.remove(key.as_str());
                }
                still_stale
            })
            .count();

        // Counted before the guard drops so stats() never sees a half-applied pass
        self.shared.stats.record_sweep(removed);
        removed
    }

    // == Start Sweep ==
    /// Spawns a background task that removes entries older than `interval`
    /// on every tick of `interval`.
    ///
    /// Each call starts an independent task. The task keeps running after the
    /// returned handle is dropped; use [`SweepHandle::stop`] to end it.
    ///
    /// An interval too large to schedule (such as `Duration::MAX`) yields a
    /// task that never sweeps but still answers to [`SweepHandle::stop`].
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime, or if `interval` is zero.
    pub fn start_sweep(&self, interval: Duration) -> SweepHandle {
        spawn_sweep_task(self, interval)
    }

    pub(crate) fn downgrade(&self) -> WeakExpiringCache {
        WeakExpiringCache {
            shared: Arc::downgrade(&self.shared),
            interval: self.interval,
            mode: self.mode,
        }
    }

    fn is_readable(&self, entry: &CacheEntry) -> bool {
        match self.mode {
            ExpiryMode::BestEffort => true,
            ExpiryMode::Strict => !entry.is_older_than(self.interval),
        }
    }
}

/// Non-owning handle held by sweep tasks.
#[derive(Debug, Clone)]
pub(crate) struct WeakExpiringCache {
    shared: Weak<Shared>,
    interval: Duration,
    mode: ExpiryMode,
}

impl WeakExpiringCache {
    /// Returns a full handle while any [`ExpiringCache`] clone is alive.
    pub(crate) fn upgrade(&self) -> Option<ExpiringCache> {
        self.shared.upgrade().map(|shared| ExpiringCache {
            shared,
            interval: self.interval,
            mode: self.mode,
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread::{self, sleep};

    const TEN_MINUTES: Duration = Duration::from_secs(600);

    #[test]
    fn test_cache_new_is_empty() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.interval(), TEN_MINUTES);
        assert_eq!(cache.mode(), ExpiryMode::BestEffort);
    }

    #[test]
    fn test_add_and_get() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        cache.add("loc-20-0", b"[\"canalave-city-area\"]".to_vec());

        assert_eq!(
            cache.get("loc-20-0").as_deref(),
            Some(&b"[\"canalave-city-area\"]"[..])
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_empty_key_and_value() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        cache.add("", Vec::new());

        assert_eq!(cache.get(""), Some(Vec::new()));
        assert!(cache.contains_key(""));
    }

    #[test]
    fn test_delete() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        cache.add("key1", "value1");
        cache.delete("key1");

        assert!(cache.is_empty());
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_delete_nonexistent_is_noop() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        cache.add("kept", "v");

        cache.delete("nonexistent");

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        cache.add("k", "v1");
        cache.add("k", "v2");

        assert_eq!(cache.get("k").as_deref(), Some(&b"v2"[..]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_resets_age() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        let max_age = Duration::from_millis(40);

        cache.add("k", "v1");
        sleep(Duration::from_millis(50));
        cache.add("k", "v2");

        assert_eq!(cache.sweep_expired(max_age), 0);
        assert_eq!(cache.get("k").as_deref(), Some(&b"v2"[..]));
    }

    #[test]
    fn test_clones_share_store() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        let other = cache.clone();

        other.add("shared", "yes");

        assert_eq!(cache.get("shared").as_deref(), Some(&b"yes"[..]));
    }

    #[test]
    fn test_sweep_expired() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        cache.add("old", "value1");
        sleep(Duration::from_millis(50));
        cache.add("fresh", "value2");

        let removed = cache.sweep_expired(Duration::from_millis(30));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("old"), None);
        assert!(cache.get("fresh").is_some());
    }

    #[test]
    fn test_best_effort_get_returns_stale_entry() {
        let cache = ExpiringCache::new(Duration::from_millis(10));

        cache.add("k", "v");
        sleep(Duration::from_millis(30));

        // Nothing swept yet, so the stale entry is still readable
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_strict_get_rejects_stale_entry() {
        let cache = ExpiringCache::with_mode(Duration::from_millis(10), ExpiryMode::Strict);

        cache.add("k", "v");
        assert!(cache.get("k").is_some());

        sleep(Duration::from_millis(30));

        assert_eq!(cache.get("k"), None);
        assert!(!cache.contains_key("k"));
        // Still stored until a sweep or delete
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stats() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        cache.add("key1", "value1");
        cache.get("key1"); // hit
        cache.get("nonexistent"); // miss
        cache.contains_key("key1");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_stats_count_sweeps() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        cache.add("a", "1");
        cache.add("b", "2");
        sleep(Duration::from_millis(5));
        cache.sweep_expired(Duration::ZERO);
        cache.sweep_expired(Duration::ZERO);

        let stats = cache.stats();
        assert_eq!(stats.swept, 2);
        assert_eq!(stats.sweeps, 2);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_stats_consistent_during_sweeps() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        let total: u64 = 2_000;
        let added = AtomicU64::new(0);

        thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..total {
                    cache.add(format!("k{i}"), "v");
                    added.fetch_add(1, Ordering::SeqCst);
                }
            });
            scope.spawn(|| {
                for _ in 0..500 {
                    cache.sweep_expired(Duration::ZERO);
                }
            });
            scope.spawn(|| {
                for _ in 0..500 {
                    let completed = added.load(Ordering::SeqCst);
                    let stats = cache.stats();
                    let accounted = stats.total_entries as u64 + stats.swept;
                    // Every finished add is either stored or counted as swept
                    assert!(accounted >= completed, "{accounted} < {completed}");
                    assert!(accounted <= total);
                }
            });
        });

        sleep(Duration::from_millis(2));
        cache.sweep_expired(Duration::ZERO);
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.swept, total);
    }

    #[test]
    fn test_delete_removes_only_named_key() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        cache.add("a", "1");
        cache.add("b", "2");

        cache.delete("a");
        cache.delete("a");

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b").as_deref(), Some(&b"2"[..]));
    }

    #[test]
    fn test_weak_handle_does_not_keep_store_alive() {
        let cache = ExpiringCache::new(TEN_MINUTES);
        let weak = cache.downgrade();

        assert!(weak.upgrade().is_some());
        drop(cache);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = ExpiringCache::new(TEN_MINUTES);

        thread::scope(|scope| {
            for worker in 0..8 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..200 {
                        let key = format!("w{worker}-{i}");
                        cache.add(key.clone(), key.clone().into_bytes());
                        assert_eq!(cache.get(&key), Some(key.clone().into_bytes()));
                        if i % 2 == 0 {
                            cache.delete(&key);
                        }
                    }
                });
            }
        });

        assert_eq!(cache.len(), 8 * 100);
        for worker in 0..8 {
            let key = format!("w{worker}-1");
            assert_eq!(cache.get(&key), Some(key.into_bytes()));
        }
    }
}

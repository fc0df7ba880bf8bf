// Time-bounded in-process cache for upstream data (airport directory, timetables)
// Entries are published whole and never mutated; expiry replaces them wholesale.

use dashmap::DashMap;
use std::any::Any;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub items_count: AtomicUsize,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub load_count: AtomicUsize,
    pub total_lookups: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
    // Upstream loads performed through `get_or_try_insert_with`
    pub load_count: usize,
    pub total_lookups: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            default_ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            default_ttl_seconds: ttl.as_secs(),
            ..Self::default()
        }
    }
}

// Key/value cache with a validity window per entry
pub trait TtlCache<K, V>: Send + Sync {
    // Live value for `key`, if any. Expired entries are dropped on the way.
    fn get(&self, key: &K) -> Option<Arc<V>>;

    // Publish `value`, replacing any previous entry. `None` uses the configured default TTL.
    fn put(&self, key: K, value: V, ttl: Option<Duration>) -> Arc<V>;

    fn invalidate(&self, key: &K) -> bool;

    // Drop every expired entry, returning how many were removed
    fn purge_expired(&self) -> usize;

    fn stats(&self) -> CacheStatsReport;
}

struct CacheEntry<V> {
    value: Arc<V>,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

type LoadGate = Mutex<Option<Box<dyn Any + Send + Sync>>>;

pub struct ExpiringCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    // One gate per key being loaded, so concurrent misses share a single load.
    // A failed load parks its error in the gate until the queued waiters have read it.
    inflight: DashMap<K, Arc<LoadGate>>,
    config: CacheConfig,
    stats: CacheStats,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config.default_ttl_seconds)
    }

    // Cached value for `key`, or the result of running `load`. Callers racing on
    // the same missing key queue behind the first load and share its outcome,
    // failures included, instead of issuing their own. Failures never reach the
    // TTL store: once the queue drains the next caller loads again.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: K,
        ttl: Option<Duration>,
        load: F,
    ) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Clone + Send + Sync + 'static,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let gate = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        let mut failure = gate.lock().await;

        // Another task may have settled the load while we waited on the gate
        let shared_failure = failure
            .as_deref()
            .and_then(|f| f.downcast_ref::<E>())
            .cloned();
        let result = match (self.live_value(&key), shared_failure) {
            (Some(value), _) => Ok(value),
            (None, Some(error)) => {
                debug!("Sharing failed load for {:?}", key);
                Err(error)
            }
            (None, None) => {
                debug!("Loading cache entry for {:?}", key);
                self.stats.load_count.fetch_add(1, Ordering::SeqCst);
                match load().await {
                    Ok(value) => Ok(self.put(key.clone(), value, ttl)),
                    Err(error) => {
                        *failure = Some(Box::new(error.clone()));
                        Err(error)
                    }
                }
            }
        };

        drop(failure);
        // map + our clone; anything above that is a waiter still queued on the gate
        self.inflight
            .remove_if(&key, |_, gate| Arc::strong_count(gate) <= 2);

        result
    }

    fn live_value(&self, key: &K) -> Option<Arc<V>> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    fn remove_entry(&self, key: &K, expired: bool) -> bool {
        let removed = if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired())
        } else {
            self.entries.remove(key)
        };

        if removed.is_some() {
            self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
            if expired {
                self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
            }
            return true;
        }
        false
    }

    fn remove_oldest_entry(&self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.key().clone());

        if let Some(oldest_key) = oldest_key {
            debug!("Cache full, evicting {:?}", oldest_key);
            if self.remove_entry(&oldest_key, false) {
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl<K, V> TtlCache<K, V> for ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        self.stats.total_lookups.fetch_add(1, Ordering::SeqCst);

        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Cache entry for {:?} expired", key);
            self.remove_entry(key, true);
        }
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn put(&self, key: K, value: V, ttl: Option<Duration>) -> Arc<V> {
        let ttl = ttl.unwrap_or_else(|| self.default_ttl());

        if !self.entries.contains_key(&key) {
            if self.entries.len() >= self.config.max_entries {
                self.purge_expired();
            }
            while self.entries.len() >= self.config.max_entries.max(1) {
                self.remove_oldest_entry();
            }
        }

        let value = Arc::new(value);
        let entry = CacheEntry {
            value: value.clone(),
            created_at: Instant::now(),
            ttl,
        };
        if self.entries.insert(key, entry).is_none() {
            self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        }
        value
    }

    fn invalidate(&self, key: &K) -> bool {
        self.remove_entry(key, false)
    }

    fn purge_expired(&self) -> usize {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .iter()
            .filter(|key| self.remove_entry(key, true))
            .count()
    }

    fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            load_count: self.stats.load_count.load(Ordering::SeqCst),
            total_lookups: self.stats.total_lookups.load(Ordering::SeqCst),
        }
    }
}

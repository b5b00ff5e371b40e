//! TTL cache-aside store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use conduit_core::{context, ConduitConfig, ConduitResult, ConfigError};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::entry::{CacheEntry, CacheStats, StatCounters};

/// Process-wide cache keyed by canonical resource locator.
///
/// Cloning yields another handle to the same entries and counters.
pub struct CacheAsideStore<T> {
    entries: Arc<DashMap<String, CacheEntry<T>>>,
    stats: Arc<StatCounters>,
    ttl: Duration,
}

impl<T> CacheAsideStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty store whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> ConduitResult<Self> {
        if ttl.is_zero() {
            return Err(ConfigError::invalid("cache_ttl", "0s", "must be greater than zero").into());
        }
        Ok(Self {
            entries: Arc::new(DashMap::new()),
            stats: Arc::new(StatCounters::default()),
            ttl,
        })
    }

    pub fn from_config(config: &ConduitConfig) -> ConduitResult<Self> {
        Self::new(config.cache_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live value for `key`, or run `loader` and cache its result.
    ///
    /// A failed loader leaves no entry behind and its error is returned as-is.
    pub async fn get_or_load<F, Fut>(&self, key: &str, loader: F) -> ConduitResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ConduitResult<T>>,
    {
        if let Some(value) = self.get(key) {
            StatCounters::bump(&self.stats.hits);
            tracing::debug!(
                key,
                correlation_id = context::correlation_id().as_deref().unwrap_or("-"),
                "Cache hit"
            );
            return Ok(value);
        }

        StatCounters::bump(&self.stats.misses);
        tracing::debug!(
            key,
            correlation_id = context::correlation_id().as_deref().unwrap_or("-"),
            "Cache miss, loading"
        );

        match loader().await {
            Ok(value) => {
                StatCounters::bump(&self.stats.loads);
                self.insert(key, value.clone());
                Ok(value)
            }
            Err(e) => {
                StatCounters::bump(&self.stats.failed_loads);
                Err(e)
            }
        }
    }

    /// Live value for `key`. An expired entry is dropped on the way out.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if entry.is_live(now) {
                return Some(entry.value().value().clone());
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, value: T) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .insert(key.to_string(), CacheEntry::new(key, value, expires_at));
    }

    /// Invalidate a single entry. Returns whether one was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Invalidate every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Entries currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    /// Purge expired entries every `interval` until the handle is dropped.
    ///
    /// A zero interval is rejected.
    pub fn spawn_sweeper(&self, interval: Duration) -> ConduitResult<SweeperHandle> {
        if interval.is_zero() {
            return Err(ConfigError::invalid(
                "cache_sweep_interval",
                "0s",
                "must be greater than zero",
            )
            .into());
        }
        let store = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Cache sweep purged expired entries");
                }
            }
        });
        Ok(SweeperHandle { task })
    }
}

impl<T> Clone for CacheAsideStore<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            stats: Arc::clone(&self.stats),
            ttl: self.ttl,
        }
    }
}

impl<T> std::fmt::Debug for CacheAsideStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAsideStore")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Background purge task; aborted when dropped.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//! Cache entry and statistics types.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;

/// A cached value with its absolute expiry.
///
/// Entries are never mutated; a reload replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    key: String,
    value: T,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(key: impl Into<String>, value: T, expires_at: Instant) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// An entry is absent once `now >= expires_at`.
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a live entry.
    pub hits: u64,
    /// Lookups that found nothing live.
    pub misses: u64,
    /// Loader invocations that succeeded and were stored.
    pub loads: u64,
    /// Loader invocations that failed; nothing was stored.
    pub failed_loads: u64,
    /// Entries currently held, including expired ones not yet purged.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub loads: AtomicU64,
    pub failed_loads: AtomicU64,
}

impl StatCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entry_count: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            failed_loads: self.failed_loads.load(Ordering::Relaxed),
            entry_count: entry_count as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_boundary() {
        let now = Instant::now();
        let entry = CacheEntry::new("k", 1, now + Duration::from_secs(10));
        assert_eq!(entry.key(), "k");
        assert_eq!(*entry.value(), 1);
        assert!(entry.is_live(now));
        assert!(entry.is_live(now + Duration::from_millis(9_999)));
        assert!(!entry.is_live(now + Duration::from_secs(10)));
    }
}

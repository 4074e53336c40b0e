//! Cache statistics

use std::ops::Add;

/// Cache statistics for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by a fresh entry
    pub hits: u64,
    /// Lookups answered by a stale entry
    pub stale_hits: u64,
    pub misses: u64,
    /// Gateway fetches started
    pub fetches: u64,
    /// Lookups that joined a fetch already in flight
    pub dedup_joins: u64,
    pub fetch_errors: u64,
    /// Fetches that completed after cancellation and were not stored
    pub discarded: u64,
    /// Entries removed by invalidation
    pub invalidations: u64,
    pub evictions: u64,
    pub entry_count: u64,
    pub in_flight: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, fresh or stale
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

impl Add for CacheStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hits: self.hits + rhs.hits,
            stale_hits: self.stale_hits + rhs.stale_hits,
            misses: self.misses + rhs.misses,
            fetches: self.fetches + rhs.fetches,
            dedup_joins: self.dedup_joins + rhs.dedup_joins,
            fetch_errors: self.fetch_errors + rhs.fetch_errors,
            discarded: self.discarded + rhs.discarded,
            invalidations: self.invalidations + rhs.invalidations,
            evictions: self.evictions + rhs.evictions,
            entry_count: self.entry_count + rhs.entry_count,
            in_flight: self.in_flight + rhs.in_flight,
        }
    }
}

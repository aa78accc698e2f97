//! Cache statistics tracking.

use std::fmt;
use std::time::{Duration, Instant};

/// Counters for one [`OfflineCache`](crate::cache::OfflineCache) instance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    // Lookups
    pub hits: u64,
    pub misses: u64,

    // Writes
    pub writes: u64,
    pub skipped_writes: u64,
    pub revalidations: u64,

    // Eviction
    pub evicted_resources: u64,
    pub evicted_tiles: u64,

    pub created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            writes: 0,
            skipped_writes: 0,
            revalidations: 0,
            evicted_resources: 0,
            evicted_tiles: 0,
            created_at: Instant::now(),
        }
    }

    /// Lookup hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Time since the cache was opened.
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    /// Record an ambient write dropped because eviction could not make room.
    pub fn record_skipped_write(&mut self) {
        self.skipped_writes += 1;
    }

    pub fn record_revalidation(&mut self) {
        self.revalidations += 1;
    }

    /// Record rows removed by one eviction pass.
    pub fn record_eviction(&mut self, resources: u64, tiles: u64) {
        self.evicted_resources += resources;
        self.evicted_tiles += tiles;
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} hit_rate={:.1}% writes={} skipped={} revalidated={} \
             evicted_resources={} evicted_tiles={}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.writes,
            self.skipped_writes,
            self.revalidations,
            self.evicted_resources,
            self.evicted_tiles,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();

        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.evicted_tiles, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.hits = 75;
        stats.misses = 25;

        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_lookups() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_record_writes() {
        let mut stats = CacheStats::new();
        stats.record_write();
        stats.record_skipped_write();
        stats.record_revalidation();

        assert_eq!(stats.writes, 1);
        assert_eq!(stats.skipped_writes, 1);
        assert_eq!(stats.revalidations, 1);
    }

    #[test]
    fn test_record_evictions_accumulate() {
        let mut stats = CacheStats::new();
        stats.record_eviction(5, 50);
        stats.record_eviction(0, 3);

        assert_eq!(stats.evicted_resources, 5);
        assert_eq!(stats.evicted_tiles, 53);
    }

    #[test]
    fn test_display() {
        let mut stats = CacheStats::new();
        stats.hits = 9;
        stats.misses = 1;

        let line = stats.to_string();
        assert!(line.contains("hits=9"));
        assert!(line.contains("hit_rate=90.0%"));
    }
}

//! Performance counters.
//!
//! Independent monotonic counters, incremented with relaxed atomics from any
//! request-handling task — no locks. `snapshot()` reads each counter
//! independently; cross-counter consistency at a single instant is neither
//! guaranteed nor required.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Process-wide dispatch counters.
#[derive(Debug)]
pub struct PerfCounters {
    started: Instant,
    static_hits: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    dynamic_calls: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerfSnapshot {
    pub static_hits: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub dynamic_calls: u64,
    pub errors: u64,
    pub total_requests: u64,
    pub uptime_seconds: u64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            static_hits: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            dynamic_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn record_static_hit(&self) {
        self.static_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dynamic_call(&self) {
        self.dynamic_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PerfSnapshot {
        let static_hits = self.static_hits.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let dynamic_calls = self.dynamic_calls.load(Ordering::Relaxed);

        PerfSnapshot {
            static_hits,
            cache_hits,
            cache_misses,
            dynamic_calls,
            errors: self.errors.load(Ordering::Relaxed),
            // Every served request lands in exactly one of these tiers
            total_requests: static_hits + cache_hits + dynamic_calls,
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counters_start_at_zero() {
        let snapshot = PerfCounters::new().snapshot();
        assert_eq!(snapshot.static_hits, 0);
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.errors, 0);
    }

    #[test]
    fn increments_are_visible_in_snapshot() {
        let counters = PerfCounters::new();
        counters.record_static_hit();
        counters.record_static_hit();
        counters.record_cache_hit();
        counters.record_cache_miss();
        counters.record_dynamic_call();
        counters.record_error();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.static_hits, 2);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.dynamic_calls, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.total_requests, 4);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counters = Arc::new(PerfCounters::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counters = counters.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    counters.record_dynamic_call();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.snapshot().dynamic_calls, 8000);
    }

    #[test]
    fn snapshot_serializes_to_flat_json() {
        let counters = PerfCounters::new();
        counters.record_static_hit();
        let json = serde_json::to_value(counters.snapshot()).unwrap();
        assert_eq!(json["static_hits"], 1);
        assert_eq!(json["total_requests"], 1);
        assert!(json["uptime_seconds"].is_u64());
    }
}

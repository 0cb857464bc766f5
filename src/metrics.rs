//! In-process counters for amortization and health tracking.
//!
//! The engine never decides cache hit vs. miss itself — callers that consume
//! the analytics snapshot (or the health-check cache in front of it)
//! increment these counters, and the aggregator only reads them back when
//! computing the hit ratio.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Shared atomic counters. Cheap to clone behind an `Arc`.
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    dispatches: AtomicU64,
    snapshots: AtomicU64,
    health_requests: AtomicU64,
    health_cache_hits: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: f64,
    pub dispatches: u64,
    pub snapshots: u64,
    pub health_requests: u64,
    pub health_cache_hits: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            dispatches: AtomicU64::new(0),
            snapshots: AtomicU64::new(0),
            health_requests: AtomicU64::new(0),
            health_cache_hits: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    pub fn record_dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_request(&self) {
        self.health_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_cache_hit(&self) {
        self.health_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Hits over total health-check requests, in [0, 1].
    pub fn cache_hit_ratio(&self) -> f64 {
        let hits = self.health_cache_hits.load(Ordering::Relaxed) as f64;
        let reqs = self.health_requests.load(Ordering::Relaxed).max(1) as f64;
        (hits / reqs * 1000.0).round() / 1000.0
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
            health_requests: self.health_requests.load(Ordering::Relaxed),
            health_cache_hits: self.health_cache_hits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

//! Performance aggregation over the time-ordered indices.
//!
//! Rolling counts come from index range-counts over fixed trailing windows;
//! the computed snapshot is written back with a short TTL so repeated reads
//! amortize. Whether a given read was served from that cache is the caller's
//! call — callers increment the hit/miss counters, the aggregator only reads
//! them when computing the ratio.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::metrics::Metrics;
use crate::store::keys::{self, RESULTS_INDEX, UPLOADS_INDEX, WORKFLOWS_INDEX};
use crate::store::traits::IndexedStore;

/// Result counts over the fixed trailing windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowCounts {
    pub h1: u64,
    pub h24: u64,
    pub d7: u64,
}

/// Index cardinalities per entity family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Totals {
    pub results: u64,
    pub workflows: u64,
    pub uploads: u64,
}

/// Immutable point-in-time aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub window: WindowCounts,
    pub totals: Totals,
    pub active_agents: u64,
    pub cache_hit_ratio: f64,
}

/// One hourly bucket in the 24-hour trend series.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrendPoint {
    /// Bucket end, "HH:MM".
    pub t: String,
    pub count: u64,
}

/// Aggregator over the shared store and the in-process counters.
#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn IndexedStore>,
    metrics: Arc<Metrics>,
    config: EngineConfig,
}

impl Analytics {
    pub fn new(store: Arc<dyn IndexedStore>, metrics: Arc<Metrics>, config: EngineConfig) -> Self {
        Self {
            store,
            metrics,
            config,
        }
    }

    /// Compute a snapshot and cache it under `analytics_snapshot` with the
    /// configured short TTL. Zero agents or zero results produce zero-valued
    /// statistics, never an error.
    pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let now = Utc::now();
        let now_ts = now.timestamp_millis() as f64 / 1000.0;

        let window = WindowCounts {
            h1: self
                .store
                .zcount(RESULTS_INDEX, now_ts - 3600.0, now_ts)
                .await?,
            h24: self
                .store
                .zcount(RESULTS_INDEX, now_ts - 86_400.0, now_ts)
                .await?,
            d7: self
                .store
                .zcount(RESULTS_INDEX, now_ts - 7.0 * 86_400.0, now_ts)
                .await?,
        };
        let totals = Totals {
            results: self.store.zcard(RESULTS_INDEX).await?,
            workflows: self.store.zcard(WORKFLOWS_INDEX).await?,
            uploads: self.store.zcard(UPLOADS_INDEX).await?,
        };

        let snapshot = Snapshot {
            timestamp: now,
            window,
            totals,
            active_agents: self.store.zcard(keys::AGENTS_INDEX).await?,
            cache_hit_ratio: self.metrics.cache_hit_ratio(),
        };

        self.store
            .set_ex(
                keys::ANALYTICS_SNAPSHOT,
                &serde_json::to_string(&snapshot)?,
                self.config.snapshot_ttl,
            )
            .await?;
        self.metrics.record_snapshot();
        info!(
            results_1h = snapshot.window.h1,
            total_results = snapshot.totals.results,
            "Analytics snapshot refreshed"
        );
        Ok(snapshot)
    }

    /// The cached snapshot, if one is still live. Callers decide whether a
    /// hit here counts toward the cache counters.
    pub async fn cached_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        match self.store.get(keys::ANALYTICS_SNAPSHOT).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Hourly result counts for the trailing 24 hours, oldest bucket first.
    /// Missing index data yields a flat series of zeros.
    pub async fn trends_24h(&self) -> Result<Vec<TrendPoint>, StoreError> {
        let now = Utc::now();
        let mut points = Vec::with_capacity(24);
        for h in (0..24).rev() {
            let end = now - ChronoDuration::hours(h);
            let start = end - ChronoDuration::hours(1);
            let count = self
                .store
                .zcount(
                    RESULTS_INDEX,
                    start.timestamp_millis() as f64 / 1000.0,
                    end.timestamp_millis() as f64 / 1000.0,
                )
                .await?;
            points.push(TrendPoint {
                t: format!("{:02}:{:02}", end.hour(), end.minute()),
                count,
            });
        }
        Ok(points)
    }

    /// Whether an external worker has refreshed its heartbeat key recently
    /// (the key carries a short TTL written by the worker).
    pub async fn worker_alive(&self) -> Result<bool, StoreError> {
        self.store.exists(keys::WORKER_HEARTBEAT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::model::JobResult;
    use crate::results::store::ResultStore;
    use crate::store::MemoryStore;

    fn analytics() -> (Arc<MemoryStore>, Arc<Metrics>, Analytics) {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(Metrics::new());
        let analytics = Analytics::new(store.clone(), metrics.clone(), EngineConfig::default());
        (store, metrics, analytics)
    }

    #[tokio::test]
    async fn empty_store_yields_zeroed_snapshot() {
        let (_, _, analytics) = analytics();
        let snap = analytics.snapshot().await.unwrap();
        assert_eq!(snap.window.h1, 0);
        assert_eq!(snap.totals.results, 0);
        assert_eq!(snap.active_agents, 0);
        assert_eq!(snap.cache_hit_ratio, 0.0);
    }

    #[tokio::test]
    async fn snapshot_counts_recent_results() {
        let (store, _, analytics) = analytics();
        let results = ResultStore::new(store.clone(), EngineConfig::default());
        results
            .save(JobResult::completed("fresh", "a", "out"))
            .await
            .unwrap();
        let mut old = JobResult::completed("old", "a", "out");
        old.timestamp = Some(Utc::now() - ChronoDuration::hours(2));
        results.save(old).await.unwrap();

        let snap = analytics.snapshot().await.unwrap();
        assert_eq!(snap.window.h1, 1);
        assert_eq!(snap.window.h24, 2);
        assert_eq!(snap.totals.results, 2);
    }

    #[tokio::test]
    async fn snapshot_is_cached_with_ttl() {
        let (_, metrics, analytics) = analytics();
        assert!(analytics.cached_snapshot().await.unwrap().is_none());
        let snap = analytics.snapshot().await.unwrap();
        let cached = analytics.cached_snapshot().await.unwrap().unwrap();
        assert_eq!(cached, snap);
        assert_eq!(metrics.snapshot().snapshots, 1);
    }

    #[tokio::test]
    async fn trends_has_24_buckets_oldest_first() {
        let (store, _, analytics) = analytics();
        let results = ResultStore::new(store, EngineConfig::default());
        results
            .save(JobResult::completed("now", "a", "out"))
            .await
            .unwrap();
        let points = analytics.trends_24h().await.unwrap();
        assert_eq!(points.len(), 24);
        assert_eq!(points[23].count, 1);
        assert!(points[..23].iter().all(|p| p.count == 0));
    }

    #[tokio::test]
    async fn worker_alive_tracks_heartbeat_key() {
        let (store, _, analytics) = analytics();
        assert!(!analytics.worker_alive().await.unwrap());
        store
            .set_ex(
                keys::WORKER_HEARTBEAT,
                "1",
                std::time::Duration::from_secs(30),
            )
            .await
            .unwrap();
        assert!(analytics.worker_alive().await.unwrap());
    }

    #[tokio::test]
    async fn cache_ratio_reflects_caller_counters() {
        let (_, metrics, analytics) = analytics();
        metrics.record_health_request();
        metrics.record_health_request();
        metrics.record_health_cache_hit();
        let snap = analytics.snapshot().await.unwrap();
        assert_eq!(snap.cache_hit_ratio, 0.5);
    }
}

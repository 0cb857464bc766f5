//! Result store — TTL'd records with a time-ordered index.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::results::model::JobResult;
use crate::store::keys::{self, RESULTS_INDEX};
use crate::store::traits::IndexedStore;

/// Store over `result:<job_id>` records plus the `results_index` sorted set.
#[derive(Clone)]
pub struct ResultStore {
    store: Arc<dyn IndexedStore>,
    config: EngineConfig,
}

impl ResultStore {
    pub fn new(store: Arc<dyn IndexedStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Persist a result with the retention TTL and index it.
    ///
    /// The index score comes from the result's own timestamp (filled with now
    /// when absent), not from write time, so late-arriving results sort where
    /// they belong.
    pub async fn save(&self, mut result: JobResult) -> Result<JobResult, StoreError> {
        let timestamp = *result.timestamp.get_or_insert_with(Utc::now);
        let body = serde_json::to_string(&result)?;
        self.store
            .set_ex(&keys::result_key(&result.job_id), &body, self.config.result_ttl)
            .await?;
        self.store
            .zadd(
                RESULTS_INDEX,
                &result.job_id,
                timestamp.timestamp_millis() as f64 / 1000.0,
            )
            .await?;
        debug!(job_id = %result.job_id, agent = ?result.agent, "Result saved");
        Ok(result)
    }

    /// Look up a result by job id. `None` when missing or expired.
    pub async fn get(&self, job_id: &str) -> Result<Option<JobResult>, StoreError> {
        match self.store.get(&keys::result_key(job_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Most-recent-first results via the index. Index entries whose record
    /// has expired are dropped silently.
    pub async fn list(&self, limit: usize) -> Result<Vec<JobResult>, StoreError> {
        let job_ids = self
            .store
            .zrevrange(RESULTS_INDEX, 0, limit as i64 - 1)
            .await?;
        let mut results = Vec::with_capacity(job_ids.len());
        for job_id in job_ids {
            match self.store.get(&keys::result_key(&job_id)).await? {
                Some(raw) => results.push(serde_json::from_str(&raw)?),
                None => debug!(job_id = %job_id, "Dropping stale result index entry"),
            }
        }
        Ok(results)
    }

    /// Total results, via index cardinality. Counts entries whose record may
    /// already have expired, so this is an upper bound.
    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.zcard(RESULTS_INDEX).await
    }

    /// Results belonging to a workflow, oldest first.
    ///
    /// Scans only the most recent `workflow_window` results and filters in
    /// memory — results older than the window are invisible to this query.
    pub async fn list_by_workflow(&self, workflow_id: &str) -> Result<Vec<JobResult>, StoreError> {
        let mut results: Vec<JobResult> = self
            .list(self.config.workflow_window)
            .await?
            .into_iter()
            .filter(|r| r.workflow_id.as_deref() == Some(workflow_id))
            .collect();
        results.sort_by_key(|r| r.timestamp);
        Ok(results)
    }

    /// Results produced by one agent, most recent first, windowed the same
    /// way as [`Self::list_by_workflow`] (window = limit × multiplier,
    /// floored).
    pub async fn list_by_agent(
        &self,
        agent_name: &str,
        limit: usize,
    ) -> Result<Vec<JobResult>, StoreError> {
        let window = self.config.agent_window(limit);
        let mut results: Vec<JobResult> = self
            .list(window)
            .await?
            .into_iter()
            .filter(|r| r.agent.as_deref() == Some(agent_name))
            .collect();
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use crate::results::model::ResultStatus;
    use crate::store::MemoryStore;

    fn result_store() -> (Arc<MemoryStore>, ResultStore) {
        let store = Arc::new(MemoryStore::new());
        let results = ResultStore::new(store.clone(), EngineConfig::default());
        (store, results)
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let (_, results) = result_store();
        let mut saved = JobResult::completed("job-1", "qa_bot", "all checks passed");
        saved.confidence_score = Some(0.92);
        saved.execution_time = Some(1.5);
        let saved = results.save(saved).await.unwrap();
        assert!(saved.timestamp.is_some());
        let got = results.get("job-1").await.unwrap().unwrap();
        assert_eq!(got, saved);
    }

    #[tokio::test]
    async fn get_missing_result_is_none() {
        let (_, results) = result_store();
        assert_eq!(results.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_orders_by_result_timestamp_not_save_order() {
        let (_, results) = result_store();
        let base = Utc::now();
        let mut newer = JobResult::completed("job-new", "a", "n");
        newer.timestamp = Some(base + ChronoDuration::seconds(1));
        let mut older = JobResult::completed("job-old", "a", "o");
        older.timestamp = Some(base);
        // Save the newer one first; the index must still sort by timestamp.
        results.save(newer).await.unwrap();
        results.save(older).await.unwrap();
        let listed = results.list(10).await.unwrap();
        assert_eq!(listed[0].job_id, "job-new");
        assert_eq!(listed[1].job_id, "job-old");
    }

    #[tokio::test]
    async fn list_by_workflow_sorts_ascending() {
        let (_, results) = result_store();
        let base = Utc::now();
        for (i, job_id) in ["s1", "s2", "s3"].iter().enumerate() {
            let mut r = JobResult::completed(*job_id, "a", "out");
            r.workflow_id = Some("wf-1".into());
            r.timestamp = Some(base + ChronoDuration::seconds(i as i64));
            results.save(r).await.unwrap();
        }
        let mut outside = JobResult::completed("other", "a", "out");
        outside.workflow_id = Some("wf-2".into());
        results.save(outside).await.unwrap();

        let wf = results.list_by_workflow("wf-1").await.unwrap();
        assert_eq!(
            wf.iter().map(|r| r.job_id.as_str()).collect::<Vec<_>>(),
            vec!["s1", "s2", "s3"]
        );
    }

    #[tokio::test]
    async fn list_by_agent_filters_and_truncates() {
        let (_, results) = result_store();
        for i in 0..5 {
            results
                .save(JobResult::completed(format!("qa-{i}"), "qa_bot", "ok"))
                .await
                .unwrap();
            results
                .save(JobResult::completed(format!("dbg-{i}"), "debugger_bot", "ok"))
                .await
                .unwrap();
        }
        let listed = results.list_by_agent("qa_bot", 3).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|r| r.agent.as_deref() == Some("qa_bot")));
    }

    #[tokio::test]
    async fn workflow_results_older_than_window_are_invisible() {
        let store = Arc::new(MemoryStore::new());
        let config = EngineConfig {
            workflow_window: 3,
            ..EngineConfig::default()
        };
        let results = ResultStore::new(store, config);
        let base = Utc::now();
        for i in 0..5 {
            let mut r = JobResult::completed(format!("s{i}"), "a", "out");
            r.workflow_id = Some("wf-1".into());
            r.timestamp = Some(base + ChronoDuration::seconds(i));
            results.save(r).await.unwrap();
        }
        // Only the 3 most recent results are scanned; s0 and s1 fall outside
        // the window even though they belong to the workflow.
        let wf = results.list_by_workflow("wf-1").await.unwrap();
        assert_eq!(
            wf.iter().map(|r| r.job_id.as_str()).collect::<Vec<_>>(),
            vec!["s2", "s3", "s4"]
        );
    }

    #[tokio::test]
    async fn agent_results_older_than_window_are_invisible() {
        let store = Arc::new(MemoryStore::new());
        let config = EngineConfig {
            agent_window_multiplier: 1,
            agent_window_floor: 2,
            ..EngineConfig::default()
        };
        let results = ResultStore::new(store, config);
        let base = Utc::now();
        // One old qa_bot result buried behind two newer results by others.
        let mut buried = JobResult::completed("buried", "qa_bot", "ok");
        buried.timestamp = Some(base);
        results.save(buried).await.unwrap();
        for i in 0..2 {
            let mut r = JobResult::completed(format!("noise-{i}"), "debugger_bot", "ok");
            r.timestamp = Some(base + ChronoDuration::seconds(i + 1));
            results.save(r).await.unwrap();
        }
        // Window = max(2 * 1, 2) = 2 scans only the noise results.
        let listed = results.list_by_agent("qa_bot", 2).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn stale_index_entries_are_dropped_from_list() {
        let (store, results) = result_store();
        results
            .save(JobResult::completed("live", "a", "out"))
            .await
            .unwrap();
        // An index entry whose record has already expired.
        store.zadd(RESULTS_INDEX, "ghost", 1.0).await.unwrap();
        let listed = results.list(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].job_id, "live");
        // The index still counts it — count is an upper bound.
        assert_eq!(results.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn error_status_round_trips() {
        let (_, results) = result_store();
        let mut failed = JobResult::completed("bad", "qa_bot", "boom");
        failed.status = ResultStatus::Error;
        results.save(failed).await.unwrap();
        let got = results.get("bad").await.unwrap().unwrap();
        assert_eq!(got.status, ResultStatus::Error);
    }
}

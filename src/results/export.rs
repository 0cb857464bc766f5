//! Result exports — recent results as JSON or a text digest, and aggregated
//! per-agent performance rows as JSON or CSV.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::agents::registry::AgentRegistry;
use crate::error::StoreError;
use crate::results::model::{JobResult, ResultStatus};
use crate::results::store::ResultStore;

/// How many agents an export will seed rows for.
const AGENT_SEED_LIMIT: usize = 1000;

/// A rendered export: filename, media type, full body.
#[derive(Debug, Clone)]
pub struct Export {
    pub filename: String,
    pub media_type: &'static str,
    pub body: String,
}

/// Output format for the performance export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Aggregated per-agent performance row.
#[derive(Debug, Clone, Serialize)]
pub struct AgentPerformance {
    pub agent_name: String,
    pub role: String,
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    /// Percentage in [0, 100], two decimal places.
    pub success_rate: f64,
    pub total_execution_time: f64,
    pub average_execution_time: f64,
    pub fastest_job: f64,
    pub slowest_job: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl AgentPerformance {
    fn seed(agent_name: String, role: String) -> Self {
        Self {
            agent_name,
            role,
            total_tasks: 0,
            successful_tasks: 0,
            failed_tasks: 0,
            success_rate: 0.0,
            total_execution_time: 0.0,
            average_execution_time: 0.0,
            fastest_job: f64::INFINITY,
            slowest_job: 0.0,
            last_activity: None,
        }
    }
}

/// Export service over the result store and the agent registry.
#[derive(Clone)]
pub struct ExportService {
    results: ResultStore,
    registry: AgentRegistry,
    export_limit: usize,
}

impl ExportService {
    pub fn new(results: ResultStore, registry: AgentRegistry, export_limit: usize) -> Self {
        Self {
            results,
            registry,
            export_limit,
        }
    }

    /// Recent results as one JSON document, named after the latest task.
    pub async fn export_json(&self) -> Result<Export, StoreError> {
        let results = self.results.list(self.export_limit).await?;
        let task_name = latest_task_name(&results);
        let body = serde_json::to_string(&json!({
            "task": task_name,
            "results": results,
        }))?;
        Ok(Export {
            filename: format!("jobforge_{}.json", sanitize_filename(&task_name)),
            media_type: "application/json",
            body,
        })
    }

    /// Recent results as a human-readable text digest.
    pub async fn export_text(&self) -> Result<Export, StoreError> {
        let results = self.results.list(self.export_limit).await?;
        let task_name = latest_task_name(&results);
        let mut body = String::new();
        body.push_str(&format!("## Task: {task_name}\n\n"));
        body.push_str("# Agent Results\n\n");
        for result in &results {
            let job = result
                .task
                .as_deref()
                .unwrap_or("Unknown Task");
            let output = result
                .output
                .as_deref()
                .unwrap_or("No output available.");
            body.push_str(&format!("## Task:\n{job}\n\n"));
            body.push_str(&format!("### Result:\n{output}\n\n"));
            let stamp = result
                .timestamp
                .unwrap_or_else(Utc::now)
                .format("%Y-%m-%d %H:%M:%S");
            body.push_str(&format!("{stamp}\n\n---\n\n"));
        }
        Ok(Export {
            filename: format!("jobforge_{}.txt", sanitize_filename(&task_name)),
            media_type: "text/plain",
            body,
        })
    }

    /// Per-agent performance rows in the requested format.
    pub async fn export_performance(&self, format: ExportFormat) -> Result<Export, StoreError> {
        let metrics = self.aggregate_performance().await?;
        match format {
            ExportFormat::Csv => {
                let mut body = String::from(
                    "agent_name,role,total_tasks,successful_tasks,failed_tasks,success_rate,\
                     total_execution_time,average_execution_time,fastest_job,slowest_job,last_activity\n",
                );
                for m in &metrics {
                    let last = m
                        .last_activity
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default();
                    body.push_str(&format!(
                        "{},{},{},{},{},{},{},{},{},{},{}\n",
                        m.agent_name,
                        m.role,
                        m.total_tasks,
                        m.successful_tasks,
                        m.failed_tasks,
                        m.success_rate,
                        m.total_execution_time,
                        m.average_execution_time,
                        m.fastest_job,
                        m.slowest_job,
                        last,
                    ));
                }
                Ok(Export {
                    filename: "agent_performance_metrics.csv".into(),
                    media_type: "text/csv",
                    body,
                })
            }
            ExportFormat::Json => {
                let body = serde_json::to_string(&json!({
                    "export_timestamp": Utc::now(),
                    "total_agents": metrics.len(),
                    "metrics": metrics,
                }))?;
                Ok(Export {
                    filename: "agent_performance_metrics.json".into(),
                    media_type: "application/json",
                    body,
                })
            }
        }
    }

    /// Fold the recent-results window into per-agent rows. Agents with no
    /// recent results still get a zeroed row; results from since-deleted
    /// agents get a row seeded from the result itself.
    async fn aggregate_performance(&self) -> Result<Vec<AgentPerformance>, StoreError> {
        let mut rows: BTreeMap<String, AgentPerformance> = BTreeMap::new();
        let agents = self
            .registry
            .list(AGENT_SEED_LIMIT)
            .await
            .map_err(|e| StoreError::Query(format!("agent seed: {e}")))?;
        for agent in agents {
            rows.insert(
                agent.name.clone(),
                AgentPerformance::seed(agent.name, agent.role),
            );
        }

        let recent = self.results.list(self.export_limit).await?;
        let mut exec_times: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for result in &recent {
            let Some(agent_name) = result.agent.clone() else {
                continue;
            };
            let row = rows.entry(agent_name.clone()).or_insert_with(|| {
                AgentPerformance::seed(
                    agent_name.clone(),
                    result.role.clone().unwrap_or_else(|| "Unknown".into()),
                )
            });
            row.total_tasks += 1;
            if result.output.is_some() && result.status != ResultStatus::Error {
                row.successful_tasks += 1;
            } else {
                row.failed_tasks += 1;
            }
            if let Some(secs) = result.execution_time {
                row.total_execution_time += secs;
                row.fastest_job = row.fastest_job.min(secs);
                row.slowest_job = row.slowest_job.max(secs);
                exec_times.entry(agent_name).or_default().push(secs);
            }
            if let Some(ts) = result.timestamp {
                if row.last_activity.is_none_or(|prev| ts > prev) {
                    row.last_activity = Some(ts);
                }
            }
        }

        let mut out: Vec<AgentPerformance> = rows.into_values().collect();
        for row in &mut out {
            if row.total_tasks > 0 {
                row.success_rate =
                    round2(row.successful_tasks as f64 / row.total_tasks as f64 * 100.0);
            }
            if let Some(times) = exec_times.get(&row.agent_name) {
                row.average_execution_time =
                    round2(times.iter().sum::<f64>() / times.len() as f64);
            }
            row.fastest_job = if row.fastest_job.is_finite() {
                round2(row.fastest_job)
            } else {
                0.0
            };
            row.slowest_job = round2(row.slowest_job);
            row.total_execution_time = round2(row.total_execution_time);
        }
        Ok(out)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn latest_task_name(results: &[JobResult]) -> String {
    // Results arrive most-recent-first from the index.
    results
        .iter()
        .find_map(|r| r.task.clone())
        .unwrap_or_else(|| "Unknown_Task".into())
}

/// Keep alphanumerics and `._-`; everything else becomes an underscore.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

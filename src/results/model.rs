//! Result data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome status written by a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    #[default]
    Completed,
    Error,
}

/// The persisted outcome of one executed job.
///
/// Created by an external worker; immutable; expires after the configured
/// retention window. `job_id` is the correlation key back to the descriptor
/// and, transitively, to a workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Seconds the worker spent executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    /// Worker self-reported confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Filled by the store on save when the worker omitted it. The index
    /// scores by this value, not by write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Original task description, for exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
}

impl JobResult {
    /// A bare completed result — the fields every worker write carries.
    pub fn completed(job_id: impl Into<String>, agent: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            workflow_id: None,
            parent_job_id: None,
            agent: Some(agent.into()),
            role: None,
            reviewed_by: None,
            status: ResultStatus::Completed,
            output: Some(output.into()),
            execution_time: None,
            confidence_score: None,
            timestamp: None,
            task: None,
        }
    }
}

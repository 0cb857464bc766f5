//! Workflow data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Step lifecycle. `Processing` is a display heuristic — there is no true
/// in-flight signal, only "queued and no result yet after a status read".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Queued,
    Processing,
    Completed,
}

/// Aggregate workflow state, derived from step states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Completed,
}

/// One step in a workflow chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step name, e.g. "admin_analysis".
    pub step: String,
    pub agent: String,
    pub job_id: String,
    pub status: StepStatus,
    /// Advisory link to the previous step's job — not enforced by the
    /// engine; sequencing is a worker convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Truncated output preview, copied from the step's result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

/// An ordered chain of dependent jobs. No separate state machine is
/// persisted: step status is re-derived from result records on every read,
/// and only the create and the completion flip are written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: String,
    pub original_task: String,
    pub steps: Vec<WorkflowStep>,
    pub status: WorkflowStatus,
    pub qa_enabled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Recent workflows partitioned by status.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowList {
    pub total: usize,
    pub active: Vec<Workflow>,
    pub completed: Vec<Workflow>,
}

/// Receipt for a spawned post-hoc review job.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReceipt {
    pub review_job_id: String,
    pub original_job_id: String,
    pub reviewer: String,
}

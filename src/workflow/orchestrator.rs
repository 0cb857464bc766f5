//! Workflow orchestrator — builds chained job descriptors and derives
//! step/workflow completion from result records.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agents::registry::AgentRegistry;
use crate::config::EngineConfig;
use crate::dispatch::assign;
use crate::dispatch::job::{JobDescriptor, Priority};
use crate::error::WorkflowError;
use crate::results::store::ResultStore;
use crate::store::keys::{self, WORKFLOWS_INDEX};
use crate::store::traits::IndexedStore;
use crate::workflow::model::{
    ReviewReceipt, StepStatus, Workflow, WorkflowList, WorkflowStatus, WorkflowStep,
};

/// Fixed agent for the analysis and feedback steps.
const ADMIN_AGENT: &str = "general_assistant";
/// Fixed agent for QA validation and post-hoc reviews.
const QA_AGENT: &str = "qa_bot";

/// Orchestrator over the shared store, the registry, and the result store.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn IndexedStore>,
    registry: AgentRegistry,
    results: ResultStore,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn IndexedStore>,
        registry: AgentRegistry,
        results: ResultStore,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            results,
            config,
        }
    }

    /// Create a workflow: admin analysis, then specialist execution, plus a
    /// QA validation and admin feedback pair when requested. Each step's job
    /// is enqueued as the chain is built; a failed enqueue mid-chain leaves
    /// the earlier jobs on the queue (no rollback).
    pub async fn create(&self, task: &str, requires_qa: bool) -> Result<Workflow, WorkflowError> {
        self.registry.ensure_defaults().await?;
        let agents = self.registry.list_all().await?;
        let specialist = assign::resolve_agent(&agents, task);

        let workflow_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let mut steps: Vec<WorkflowStep> = Vec::with_capacity(if requires_qa { 4 } else { 2 });

        let admin_id = self
            .enqueue_step(
                &workflow_id,
                &mut steps,
                "admin_analysis",
                ADMIN_AGENT,
                &format!("Analyze task and produce execution plan: {task}"),
                None,
            )
            .await?;
        let specialist_id = self
            .enqueue_step(
                &workflow_id,
                &mut steps,
                "specialist_execution",
                &specialist,
                task,
                Some(admin_id),
            )
            .await?;
        if requires_qa {
            let qa_id = self
                .enqueue_step(
                    &workflow_id,
                    &mut steps,
                    "qa_validation",
                    QA_AGENT,
                    &format!("Review and evaluate specialist output for: {task}"),
                    Some(specialist_id),
                )
                .await?;
            self.enqueue_step(
                &workflow_id,
                &mut steps,
                "admin_feedback",
                ADMIN_AGENT,
                &format!("Provide final summary and recommendations for: {task}"),
                Some(qa_id),
            )
            .await?;
        }

        let workflow = Workflow {
            workflow_id: workflow_id.clone(),
            original_task: task.to_string(),
            steps,
            status: WorkflowStatus::Running,
            qa_enabled: requires_qa,
            created_at,
            completed_at: None,
        };
        self.persist(&workflow).await?;
        self.store
            .zadd(
                WORKFLOWS_INDEX,
                &workflow_id,
                created_at.timestamp_millis() as f64 / 1000.0,
            )
            .await?;

        info!(
            workflow_id = %workflow_id,
            steps = workflow.steps.len(),
            qa = requires_qa,
            "Workflow created"
        );
        Ok(workflow)
    }

    /// Load a workflow and re-derive step status from result records.
    ///
    /// Completed steps are skipped; a step whose result exists becomes
    /// completed and gets a truncated output preview; a still-queued step is
    /// optimistically relabeled processing. When every step is completed the
    /// workflow flips to completed — the only write this method performs
    /// beyond re-persisting the derived step fields.
    pub async fn status(&self, workflow_id: &str) -> Result<Workflow, WorkflowError> {
        let raw = self
            .store
            .get(&keys::workflow_key(workflow_id))
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                workflow_id: workflow_id.to_string(),
            })?;
        let mut workflow: Workflow =
            serde_json::from_str(&raw).map_err(crate::error::StoreError::Serialization)?;

        let mut changed = false;
        let mut completed_count = 0;
        for step in &mut workflow.steps {
            if step.status == StepStatus::Completed {
                completed_count += 1;
                continue;
            }
            match self.results.get(&step.job_id).await? {
                Some(result) => {
                    step.status = StepStatus::Completed;
                    step.output = result
                        .output
                        .map(|o| truncate_chars(&o, self.config.output_preview_chars));
                    step.execution_time = result.execution_time;
                    step.confidence_score = result.confidence_score;
                    completed_count += 1;
                    changed = true;
                }
                None if step.status == StepStatus::Queued => {
                    step.status = StepStatus::Processing;
                    changed = true;
                }
                None => {}
            }
        }

        if completed_count == workflow.steps.len() && workflow.status != WorkflowStatus::Completed {
            workflow.status = WorkflowStatus::Completed;
            workflow.completed_at = Some(Utc::now());
            changed = true;
            info!(workflow_id = %workflow.workflow_id, "Workflow completed");
        }

        if changed {
            self.persist(&workflow).await?;
        }
        Ok(workflow)
    }

    /// Recent workflows partitioned into active and completed. Stale index
    /// entries are dropped silently.
    pub async fn list(&self, limit: usize) -> Result<WorkflowList, WorkflowError> {
        let ids = self
            .store
            .zrevrange(WORKFLOWS_INDEX, 0, limit as i64 - 1)
            .await?;
        let mut active = Vec::new();
        let mut completed = Vec::new();
        for id in ids {
            match self.store.get(&keys::workflow_key(&id)).await? {
                Some(raw) => {
                    let workflow: Workflow = serde_json::from_str(&raw)
                        .map_err(crate::error::StoreError::Serialization)?;
                    match workflow.status {
                        WorkflowStatus::Running => active.push(workflow),
                        WorkflowStatus::Completed => completed.push(workflow),
                    }
                }
                None => debug!(workflow_id = %id, "Dropping stale workflow index entry"),
            }
        }
        Ok(WorkflowList {
            total: active.len() + completed.len(),
            active,
            completed,
        })
    }

    /// Spawn a post-hoc QA review job for an existing result.
    pub async fn admin_review(
        &self,
        job_id: &str,
        review_prompt: &str,
    ) -> Result<ReviewReceipt, WorkflowError> {
        let descriptor = JobDescriptor {
            job_id: Uuid::new_v4().to_string(),
            job: format!("{review_prompt}\n\nOriginal Job ID: {job_id}"),
            agent_name: QA_AGENT.into(),
            priority: Priority::Normal,
            requires_qa: false,
            created_at: Utc::now(),
            workflow_id: None,
            step: None,
            parent_job_id: Some(job_id.to_string()),
            mode: "admin_review".into(),
        };
        self.store
            .lpush(
                keys::QUEUE,
                &serde_json::to_string(&descriptor)
                    .map_err(crate::error::StoreError::Serialization)?,
            )
            .await?;
        info!(review_job_id = %descriptor.job_id, original_job_id = %job_id, "Review queued");
        Ok(ReviewReceipt {
            review_job_id: descriptor.job_id,
            original_job_id: job_id.to_string(),
            reviewer: QA_AGENT.into(),
        })
    }

    async fn enqueue_step(
        &self,
        workflow_id: &str,
        steps: &mut Vec<WorkflowStep>,
        step_name: &str,
        agent: &str,
        job_text: &str,
        parent: Option<String>,
    ) -> Result<String, WorkflowError> {
        let job_id = Uuid::new_v4().to_string();
        let descriptor = JobDescriptor {
            job_id: job_id.clone(),
            job: job_text.to_string(),
            agent_name: agent.to_string(),
            priority: Priority::Normal,
            requires_qa: false,
            created_at: Utc::now(),
            workflow_id: Some(workflow_id.to_string()),
            step: Some(step_name.to_string()),
            parent_job_id: parent.clone(),
            mode: step_name.to_string(),
        };
        self.store
            .lpush(
                keys::QUEUE,
                &serde_json::to_string(&descriptor)
                    .map_err(crate::error::StoreError::Serialization)?,
            )
            .await?;
        steps.push(WorkflowStep {
            step: step_name.to_string(),
            agent: agent.to_string(),
            job_id: job_id.clone(),
            status: StepStatus::Queued,
            depends_on: parent,
            output: None,
            execution_time: None,
            confidence_score: None,
        });
        Ok(job_id)
    }

    async fn persist(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        let body =
            serde_json::to_string(workflow).map_err(crate::error::StoreError::Serialization)?;
        self.store
            .set(&keys::workflow_key(&workflow.workflow_id), &body)
            .await?;
        Ok(())
    }
}

/// Char-safe truncation with an ellipsis marker, mirroring the step output
/// preview behavior.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

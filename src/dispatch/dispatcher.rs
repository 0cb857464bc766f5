//! Job dispatcher — resolves an agent and enqueues a serialized descriptor.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::agents::registry::AgentRegistry;
use crate::dispatch::assign;
use crate::dispatch::job::{JobDescriptor, Priority};
use crate::error::{DispatchError, RegistryError};
use crate::metrics::Metrics;
use crate::store::keys;
use crate::store::traits::IndexedStore;

/// A job submission.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    /// Free-form job text.
    pub job: String,
    /// Explicit agent; `None` engages keyword auto-assignment.
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub requires_qa: bool,
}

/// What the caller gets back after a successful dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub job_id: String,
    pub agent: String,
    pub queue: &'static str,
}

/// Dispatcher over the shared store and the agent registry.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn IndexedStore>,
    registry: AgentRegistry,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn IndexedStore>, registry: AgentRegistry, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            registry,
            metrics,
        }
    }

    /// Primary dispatch path.
    ///
    /// Resolves the target agent (explicit or keyword-assigned, bootstrapping
    /// the default set when the registry is empty), bumps the agent's task
    /// count, and pushes the descriptor onto the priority's queue.
    pub async fn dispatch(&self, request: TaskRequest) -> Result<DispatchReceipt, DispatchError> {
        let job_text = request.job.trim();
        if job_text.is_empty() {
            return Err(DispatchError::InvalidInput("job text is required".into()));
        }

        let agent_name = match &request.agent_name {
            Some(explicit) => self.registry.get(explicit).await?.name,
            None => self.auto_assign(job_text).await?,
        };

        let descriptor = JobDescriptor {
            job_id: Uuid::new_v4().to_string(),
            job: job_text.to_string(),
            agent_name: agent_name.clone(),
            priority: request.priority,
            requires_qa: request.requires_qa,
            created_at: Utc::now(),
            workflow_id: None,
            step: None,
            parent_job_id: None,
            mode: "agent_dispatch".into(),
        };

        self.registry.record_assignment(&agent_name).await?;

        let queue = request.priority.queue_name();
        let body = serde_json::to_string(&descriptor)
            .map_err(crate::error::StoreError::Serialization)?;
        self.store.lpush(queue, &body).await?;
        self.metrics.record_dispatch();

        info!(
            job_id = %descriptor.job_id,
            agent = %agent_name,
            queue,
            "Job dispatched"
        );
        Ok(DispatchReceipt {
            job_id: descriptor.job_id,
            agent: agent_name,
            queue,
        })
    }

    /// Legacy mode-based dispatch path.
    ///
    /// Resolves a mode tag ("analyze", "review", "fix", ...) to a role and
    /// picks the first agent holding it, falling back to the most recently
    /// registered agent. Unlike [`Self::dispatch`], an empty registry is an
    /// error here, not a bootstrap trigger.
    pub async fn dispatch_by_mode(
        &self,
        mode: &str,
        job_text: &str,
    ) -> Result<DispatchReceipt, DispatchError> {
        let agents = self.registry.list_all().await?;
        if agents.is_empty() {
            return Err(DispatchError::NoAgentsRegistered);
        }

        let mode_lower = mode.to_lowercase();
        let target_role = match mode_lower.as_str() {
            "analyze" => "Analyze",
            "review" | "qa" => "QA",
            "debug" | "fix" => "Debug",
            "security" => "Security",
            other => other,
        };
        let target = agents
            .iter()
            .find(|a| a.role.eq_ignore_ascii_case(target_role))
            .unwrap_or(&agents[0]);

        let descriptor = JobDescriptor {
            job_id: Uuid::new_v4().to_string(),
            job: job_text.to_string(),
            agent_name: target.name.clone(),
            priority: Priority::Normal,
            requires_qa: false,
            created_at: Utc::now(),
            workflow_id: Some(Uuid::new_v4().to_string()),
            step: None,
            parent_job_id: None,
            mode: mode.to_string(),
        };
        let body = serde_json::to_string(&descriptor)
            .map_err(crate::error::StoreError::Serialization)?;
        self.store.lpush(keys::QUEUE, &body).await?;
        self.metrics.record_dispatch();

        info!(job_id = %descriptor.job_id, agent = %target.name, mode, "Job dispatched (legacy)");
        Ok(DispatchReceipt {
            job_id: descriptor.job_id,
            agent: target.name.clone(),
            queue: keys::QUEUE,
        })
    }

    /// Depth of one queue.
    pub async fn queue_len(&self, queue: &str) -> Result<u64, DispatchError> {
        Ok(self.store.llen(queue).await?)
    }

    /// Total jobs waiting across all priority queues.
    pub async fn total_queued(&self) -> Result<u64, DispatchError> {
        let mut total = 0;
        for queue in keys::ALL_QUEUES {
            total += self.store.llen(queue).await?;
        }
        Ok(total)
    }

    async fn auto_assign(&self, job_text: &str) -> Result<String, DispatchError> {
        let mut agents = self.registry.list_all().await?;
        if agents.is_empty() {
            self.registry.ensure_defaults().await?;
            agents = self.registry.list_all().await?;
        }
        let name = assign::resolve_agent(&agents, job_text);
        // The fallback name must exist before we record the assignment.
        match self.registry.get(&name).await {
            Ok(agent) => Ok(agent.name),
            Err(RegistryError::NotFound { .. }) => {
                self.registry.ensure_defaults().await?;
                Ok(self.registry.get(assign::DEFAULT_AGENT).await?.name)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn engine() -> (Arc<MemoryStore>, Dispatcher) {
        let store = Arc::new(MemoryStore::new());
        let registry = AgentRegistry::new(store.clone());
        let dispatcher = Dispatcher::new(store.clone(), registry, Arc::new(Metrics::new()));
        (store, dispatcher)
    }

    fn request(job: &str, priority: Priority) -> TaskRequest {
        TaskRequest {
            job: job.into(),
            agent_name: None,
            priority,
            requires_qa: false,
        }
    }

    #[tokio::test]
    async fn empty_job_text_is_invalid() {
        let (_, dispatcher) = engine();
        let err = dispatcher.dispatch(request("   ", Priority::Normal)).await;
        assert!(matches!(err, Err(DispatchError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn dispatch_bootstraps_defaults_on_empty_registry() {
        let (_, dispatcher) = engine();
        let receipt = dispatcher
            .dispatch(request("summarize the report", Priority::Normal))
            .await
            .unwrap();
        assert_eq!(receipt.agent, "general_assistant");
        assert_eq!(receipt.queue, "queue");
    }

    #[tokio::test]
    async fn debug_text_routes_to_debugger() {
        let (_, dispatcher) = engine();
        let receipt = dispatcher
            .dispatch(request("debug the login flow", Priority::Normal))
            .await
            .unwrap();
        assert_eq!(receipt.agent, "debugger_bot");
    }

    #[tokio::test]
    async fn assignment_sees_role_holders_buried_in_a_large_registry() {
        let (store, dispatcher) = engine();
        let registry = AgentRegistry::new(store.clone());
        registry.ensure_defaults().await.unwrap();
        // Push qa_bot to the bottom of the time index, then bury it under
        // more agents than any bounded recent-first scan would cover.
        store.zadd(keys::AGENTS_INDEX, "qa_bot", 1.0).await.unwrap();
        for i in 0..60 {
            registry
                .register(crate::agents::NewAgent {
                    name: format!("filler {i}"),
                    role: "Assistant".into(),
                    description: None,
                    skills: vec![],
                    model: "gpt-4o-mini".into(),
                })
                .await
                .unwrap();
        }
        let receipt = dispatcher
            .dispatch(request("verify the release notes", Priority::Normal))
            .await
            .unwrap();
        assert_eq!(receipt.agent, "qa_bot");
    }

    #[tokio::test]
    async fn explicit_unknown_agent_is_not_found() {
        let (_, dispatcher) = engine();
        let err = dispatcher
            .dispatch(TaskRequest {
                job: "anything".into(),
                agent_name: Some("ghost".into()),
                priority: Priority::Normal,
                requires_qa: false,
            })
            .await;
        assert!(matches!(
            err,
            Err(DispatchError::Registry(RegistryError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn high_priority_jobs_land_only_in_queue_high() {
        let (store, dispatcher) = engine();
        for _ in 0..3 {
            dispatcher
                .dispatch(request("summarize notes", Priority::High))
                .await
                .unwrap();
        }
        assert_eq!(store.llen(keys::QUEUE_HIGH).await.unwrap(), 3);
        assert_eq!(store.llen(keys::QUEUE).await.unwrap(), 0);
        assert_eq!(store.llen(keys::QUEUE_LOW).await.unwrap(), 0);
        assert_eq!(dispatcher.total_queued().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn dispatch_increments_agent_task_count() {
        let (store, dispatcher) = engine();
        dispatcher
            .dispatch(request("summarize notes", Priority::Normal))
            .await
            .unwrap();
        let registry = AgentRegistry::new(store);
        let agent = registry.get("general_assistant").await.unwrap();
        assert_eq!(agent.task_count, 1);
        assert!(agent.last_assigned.is_some());
    }

    #[tokio::test]
    async fn enqueued_descriptor_round_trips() {
        let (store, dispatcher) = engine();
        let receipt = dispatcher
            .dispatch(request("verify the release", Priority::Low))
            .await
            .unwrap();
        let raw = store
            .brpop(keys::QUEUE_LOW, std::time::Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        let descriptor: JobDescriptor = serde_json::from_str(&raw).unwrap();
        assert_eq!(descriptor.job_id, receipt.job_id);
        assert_eq!(descriptor.agent_name, "qa_bot");
        assert_eq!(descriptor.mode, "agent_dispatch");
    }

    #[tokio::test]
    async fn legacy_path_fails_on_empty_registry() {
        let (_, dispatcher) = engine();
        let err = dispatcher.dispatch_by_mode("analyze", "look at this").await;
        assert!(matches!(err, Err(DispatchError::NoAgentsRegistered)));
    }

    #[tokio::test]
    async fn legacy_path_resolves_mode_aliases() {
        let (store, dispatcher) = engine();
        AgentRegistry::new(store.clone())
            .ensure_defaults()
            .await
            .unwrap();
        let receipt = dispatcher
            .dispatch_by_mode("fix", "broken pipeline")
            .await
            .unwrap();
        assert_eq!(receipt.agent, "debugger_bot");
        let raw = store
            .brpop(keys::QUEUE, std::time::Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        let descriptor: JobDescriptor = serde_json::from_str(&raw).unwrap();
        assert!(descriptor.workflow_id.is_some());
        assert_eq!(descriptor.mode, "fix");
    }
}

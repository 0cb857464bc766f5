//! Agent registry — CRUD over worker profiles with a time-ordered index.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::agents::model::{Agent, NewAgent, normalize_name};
use crate::error::RegistryError;
use crate::store::keys::{self, AGENTS_INDEX};
use crate::store::traits::IndexedStore;

/// Registry over `agent:<name>` records plus the `agents_index` sorted set.
#[derive(Clone)]
pub struct AgentRegistry {
    store: Arc<dyn IndexedStore>,
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn IndexedStore>) -> Self {
        Self { store }
    }

    /// Register a new agent. Fails with `Conflict` if an agent with the same
    /// normalized name already exists. Writes the record and the index entry.
    pub async fn register(&self, spec: NewAgent) -> Result<Agent, RegistryError> {
        let name = normalize_name(&spec.name);
        let key = keys::agent_key(&name);
        if self.store.exists(&key).await? {
            return Err(RegistryError::Conflict { name });
        }

        let agent = Agent {
            name: name.clone(),
            role: spec.role,
            description: spec.description,
            skills: spec.skills,
            model: spec.model,
            created_at: Utc::now(),
            task_count: 0,
            last_assigned: None,
        };
        self.write_indexed(&agent).await?;
        info!(agent = %name, role = %agent.role, "Agent registered");
        Ok(agent)
    }

    /// Get an agent by name (any casing).
    pub async fn get(&self, name: &str) -> Result<Agent, RegistryError> {
        let name = normalize_name(name);
        let raw = self
            .store
            .get(&keys::agent_key(&name))
            .await?
            .ok_or(RegistryError::NotFound { name })?;
        Ok(serde_json::from_str(&raw).map_err(crate::error::StoreError::Serialization)?)
    }

    /// List agents, most-recently-created first. Index entries whose record
    /// has gone missing are dropped, not reported.
    pub async fn list(&self, limit: usize) -> Result<Vec<Agent>, RegistryError> {
        let names = self
            .store
            .zrevrange(AGENTS_INDEX, 0, limit as i64 - 1)
            .await?;
        let mut agents = Vec::with_capacity(names.len());
        for name in names {
            match self.store.get(&keys::agent_key(&name)).await? {
                Some(raw) => agents
                    .push(serde_json::from_str(&raw).map_err(crate::error::StoreError::Serialization)?),
                None => debug!(agent = %name, "Dropping stale agent index entry"),
            }
        }
        Ok(agents)
    }

    /// List every registered agent, most-recently-created first.
    pub async fn list_all(&self) -> Result<Vec<Agent>, RegistryError> {
        let total = self.count().await?;
        if total == 0 {
            return Ok(Vec::new());
        }
        self.list(total as usize).await
    }

    /// Registered agent count, via index cardinality.
    pub async fn count(&self) -> Result<u64, RegistryError> {
        Ok(self.store.zcard(AGENTS_INDEX).await?)
    }

    /// Delete an agent and its index entry. Returns whether it existed.
    pub async fn delete(&self, name: &str) -> Result<bool, RegistryError> {
        let name = normalize_name(name);
        let existed = self.store.delete(&keys::agent_key(&name)).await?;
        self.store.zrem(AGENTS_INDEX, &name).await?;
        if existed {
            info!(agent = %name, "Agent deleted");
        }
        Ok(existed)
    }

    /// Bump `task_count` and stamp `last_assigned`.
    ///
    /// Read-modify-write with no compare-and-swap: under concurrent dispatch
    /// the last writer wins and an increment can be lost. Accepted trade-off,
    /// part of the public contract.
    pub async fn record_assignment(&self, name: &str) -> Result<Agent, RegistryError> {
        let mut agent = self.get(name).await?;
        agent.task_count += 1;
        agent.last_assigned = Some(Utc::now());
        self.store
            .set(
                &keys::agent_key(&agent.name),
                &serde_json::to_string(&agent).map_err(crate::error::StoreError::Serialization)?,
            )
            .await?;
        Ok(agent)
    }

    /// Idempotently create the bootstrap agent set. Existing records are
    /// left untouched.
    pub async fn ensure_defaults(&self) -> Result<(), RegistryError> {
        for spec in default_agents() {
            let name = normalize_name(&spec.name);
            if self.store.exists(&keys::agent_key(&name)).await? {
                continue;
            }
            let agent = Agent {
                name: name.clone(),
                role: spec.role,
                description: spec.description,
                skills: spec.skills,
                model: spec.model,
                created_at: Utc::now(),
                task_count: 0,
                last_assigned: None,
            };
            self.write_indexed(&agent).await?;
            debug!(agent = %name, "Default agent created");
        }
        Ok(())
    }

    async fn write_indexed(&self, agent: &Agent) -> Result<(), RegistryError> {
        let body =
            serde_json::to_string(agent).map_err(crate::error::StoreError::Serialization)?;
        self.store
            .set(&keys::agent_key(&agent.name), &body)
            .await?;
        self.store
            .zadd(
                AGENTS_INDEX,
                &agent.name,
                agent.created_at.timestamp_millis() as f64 / 1000.0,
            )
            .await?;
        Ok(())
    }
}

/// The fixed bootstrap set: general assistant, analyzer, QA, debugger.
pub fn default_agents() -> Vec<NewAgent> {
    vec![
        NewAgent {
            name: "general_assistant".into(),
            role: "Assistant".into(),
            description: Some("General-purpose assistant for various tasks".into()),
            skills: vec!["general_help".into(), "analysis".into(), "writing".into()],
            model: "gpt-4o-mini".into(),
        },
        NewAgent {
            name: "analyzer_bot".into(),
            role: "Analyze".into(),
            description: Some(
                "Reads uploaded projects and generates structured analysis reports".into(),
            ),
            skills: vec![
                "code_summary".into(),
                "file_classification".into(),
                "architecture_analysis".into(),
            ],
            model: "gpt-4o-mini".into(),
        },
        NewAgent {
            name: "qa_bot".into(),
            role: "QA".into(),
            description: Some("Reviews outputs and scores their correctness".into()),
            skills: vec![
                "evaluation".into(),
                "fact_check".into(),
                "quality_review".into(),
            ],
            model: "gpt-4o-mini".into(),
        },
        NewAgent {
            name: "debugger_bot".into(),
            role: "Debug".into(),
            description: Some("Runs code lint and identifies errors or logic gaps".into()),
            skills: vec![
                "static_analysis".into(),
                "error_fix".into(),
                "performance_optimization".into(),
            ],
            model: "gpt-4o-mini".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> AgentRegistry {
        AgentRegistry::new(Arc::new(MemoryStore::new()))
    }

    fn spec(name: &str, role: &str) -> NewAgent {
        NewAgent {
            name: name.into(),
            role: role.into(),
            description: None,
            skills: vec![],
            model: "gpt-4o-mini".into(),
        }
    }

    #[tokio::test]
    async fn list_all_covers_every_registered_agent() {
        let reg = registry();
        for i in 0..60 {
            reg.register(spec(&format!("agent {i}"), "Assistant"))
                .await
                .unwrap();
        }
        assert_eq!(reg.list(50).await.unwrap().len(), 50);
        assert_eq!(reg.list_all().await.unwrap().len(), 60);
    }

    #[tokio::test]
    async fn register_then_get_returns_fresh_record() {
        let reg = registry();
        reg.register(spec("Echo Bot", "Assistant")).await.unwrap();
        let got = reg.get("echo bot").await.unwrap();
        assert_eq!(got.name, "echo_bot");
        assert_eq!(got.task_count, 0);
        assert!(got.last_assigned.is_none());
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_after_normalization() {
        let reg = registry();
        reg.register(spec("qa_bot", "QA")).await.unwrap();
        let err = reg.register(spec("  QA Bot ", "QA")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { name } if name == "qa_bot"));
    }

    #[tokio::test]
    async fn get_missing_agent_is_not_found() {
        let reg = registry();
        let err = reg.get("ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { name } if name == "ghost"));
    }

    #[tokio::test]
    async fn list_orders_most_recent_first() {
        let reg = registry();
        reg.register(spec("first", "Assistant")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        reg.register(spec("second", "Assistant")).await.unwrap();
        let agents = reg.list(10).await.unwrap();
        assert_eq!(agents[0].name, "second");
        assert_eq!(agents[1].name, "first");
    }

    #[tokio::test]
    async fn list_drops_stale_index_entries() {
        let store = Arc::new(MemoryStore::new());
        let reg = AgentRegistry::new(store.clone());
        reg.register(spec("keeper", "Assistant")).await.unwrap();
        reg.register(spec("goner", "Assistant")).await.unwrap();
        // Simulate primary-record expiry without touching the index.
        store.delete(&keys::agent_key("goner")).await.unwrap();
        store.zadd(AGENTS_INDEX, "goner", 1.0).await.unwrap();
        let agents = reg.list(10).await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "keeper");
    }

    #[tokio::test]
    async fn record_assignment_bumps_count() {
        let reg = registry();
        reg.register(spec("worker", "Assistant")).await.unwrap();
        reg.record_assignment("worker").await.unwrap();
        let agent = reg.record_assignment("worker").await.unwrap();
        assert_eq!(agent.task_count, 2);
        assert!(agent.last_assigned.is_some());
    }

    #[tokio::test]
    async fn ensure_defaults_is_idempotent() {
        let reg = registry();
        reg.ensure_defaults().await.unwrap();
        reg.ensure_defaults().await.unwrap();
        assert_eq!(reg.count().await.unwrap(), 4);
        let qa = reg.get("qa_bot").await.unwrap();
        assert_eq!(qa.role, "QA");
        let dbg = reg.get("debugger_bot").await.unwrap();
        assert_eq!(dbg.role, "Debug");
    }

    #[tokio::test]
    async fn delete_removes_record_and_index_entry() {
        let reg = registry();
        reg.register(spec("doomed", "Assistant")).await.unwrap();
        assert!(reg.delete("doomed").await.unwrap());
        assert!(!reg.delete("doomed").await.unwrap());
        assert_eq!(reg.count().await.unwrap(), 0);
    }
}

//! Job descriptor and priority types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::store::keys;

/// Queue priority for a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// The queue this priority maps to.
    pub fn queue_name(self) -> &'static str {
        match self {
            Self::High => keys::QUEUE_HIGH,
            Self::Normal => keys::QUEUE,
            Self::Low => keys::QUEUE_LOW,
        }
    }
}

impl FromStr for Priority {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(DispatchError::InvalidInput(format!(
                "unknown priority '{other}' (expected low, normal, or high)"
            ))),
        }
    }
}

/// One unit of work awaiting an external worker.
///
/// Immutable once enqueued; consumed at most once from the engine's
/// perspective (no redelivery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: String,
    /// Free-form job text.
    pub job: String,
    pub agent_name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub requires_qa: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Workflow step name, when this job belongs to a workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Advisory link to the job this one depends on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<String>,
    /// Dispatch mode tag consumed by workers, e.g. "agent_dispatch" or a
    /// workflow step name.
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" normal ".parse::<Priority>().unwrap(), Priority::Normal);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_maps_to_queue() {
        assert_eq!(Priority::High.queue_name(), "queue_high");
        assert_eq!(Priority::Normal.queue_name(), "queue");
        assert_eq!(Priority::Low.queue_name(), "queue_low");
    }

    #[test]
    fn descriptor_omits_absent_workflow_fields() {
        let job = JobDescriptor {
            job_id: "j1".into(),
            job: "do things".into(),
            agent_name: "general_assistant".into(),
            priority: Priority::Normal,
            requires_qa: false,
            created_at: Utc::now(),
            workflow_id: None,
            step: None,
            parent_job_id: None,
            mode: "agent_dispatch".into(),
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(!json.contains("workflow_id"));
        assert!(!json.contains("parent_job_id"));
        assert!(json.contains("\"priority\":\"normal\""));
    }
}

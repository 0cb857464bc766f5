//! Agent data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named worker profile a job can be routed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Normalized unique name (lower-case, underscores for spaces).
    pub name: String,
    /// Core function, e.g. "QA", "Debug", "Analyze".
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Default text-generation model for this agent.
    pub model: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub task_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_assigned: Option<DateTime<Utc>>,
}

/// Registration request — everything the caller provides; the registry fills
/// in `created_at` and the counters.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub model: String,
}

/// Canonical storage form of an agent name: trimmed, lower-cased, spaces
/// replaced with underscores. Names differing only in case or whitespace
/// collapse to the same key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_spaces() {
        assert_eq!(normalize_name("QA Bot"), "qa_bot");
        assert_eq!(normalize_name("  qa_bot  "), "qa_bot");
        assert_eq!(normalize_name("Qa_Bot"), "qa_bot");
    }
}

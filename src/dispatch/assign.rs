//! Keyword-based agent auto-assignment.
//!
//! The table is ordered data, evaluated top-to-bottom: the first row with any
//! keyword present in the job text wins, independent of agent registration
//! order. Missing role-holders and unmatched text both fall back to the
//! default assistant.

use crate::agents::model::Agent;

/// Fallback agent when nothing matches or the matched role has no holder.
pub const DEFAULT_AGENT: &str = "general_assistant";

/// Ordered (keywords, role) rows. Earlier rows win ties.
pub const ASSIGNMENT_TABLE: &[(&[&str], &str)] = &[
    (&["test", "qa", "quality", "validate", "verify"], "QA"),
    (&["debug", "fix", "error", "bug"], "Debug"),
    (&["analyze", "review", "audit", "inspect"], "Analyze"),
    (&["code", "develop", "implement", "create"], "Developer"),
];

/// First role whose keyword row matches the lower-cased job text.
pub fn match_role(job_text: &str) -> Option<&'static str> {
    let text = job_text.to_lowercase();
    ASSIGNMENT_TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, role)| *role)
}

/// Resolve a job to an agent name among `agents`.
pub fn resolve_agent(agents: &[Agent], job_text: &str) -> String {
    match match_role(job_text) {
        Some(role) => agents
            .iter()
            .find(|a| a.role == role)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| DEFAULT_AGENT.to_string()),
        None => DEFAULT_AGENT.to_string(),
    }
}

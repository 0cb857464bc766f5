//! Configuration types.

use std::time::Duration;

use tracing::warn;

/// Engine configuration.
///
/// Window sizes for the by-workflow and by-agent result queries are
/// deliberate recency trade-offs, not correctness knobs: results older than
/// the window are invisible to those queries.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retention window for result records.
    pub result_ttl: Duration,
    /// Retention window for upload metadata records.
    pub upload_ttl: Duration,
    /// How many recent results the by-workflow query scans.
    pub workflow_window: usize,
    /// By-agent query window is `limit * agent_window_multiplier`,
    /// floored at `agent_window_floor`.
    pub agent_window_multiplier: usize,
    /// Minimum by-agent query window.
    pub agent_window_floor: usize,
    /// Maximum results pulled into an export.
    pub export_limit: usize,
    /// TTL for the cached analytics snapshot.
    pub snapshot_ttl: Duration,
    /// Step output preview length (chars) copied onto workflow steps.
    pub output_preview_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_ttl: Duration::from_secs(3600), // 1 hour
            upload_ttl: Duration::from_secs(7 * 86_400), // 7 days
            workflow_window: 200,
            agent_window_multiplier: 5,
            agent_window_floor: 50,
            export_limit: 1000,
            snapshot_ttl: Duration::from_secs(60),
            output_preview_chars: 300,
        }
    }
}

impl EngineConfig {
    /// Build a config from `JOBFORGE_*` environment variables, falling back
    /// to defaults (with a warning) on unset or unparsable values.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = read_env_u64("JOBFORGE_RESULT_TTL_SECS") {
            cfg.result_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = read_env_u64("JOBFORGE_UPLOAD_TTL_SECS") {
            cfg.upload_ttl = Duration::from_secs(secs);
        }
        if let Some(n) = read_env_u64("JOBFORGE_WORKFLOW_WINDOW") {
            cfg.workflow_window = n as usize;
        }
        if let Some(n) = read_env_u64("JOBFORGE_EXPORT_LIMIT") {
            cfg.export_limit = n as usize;
        }
        if let Some(secs) = read_env_u64("JOBFORGE_SNAPSHOT_TTL_SECS") {
            cfg.snapshot_ttl = Duration::from_secs(secs);
        }
        cfg
    }

    /// Window size for the by-agent result query.
    pub fn agent_window(&self, limit: usize) -> usize {
        (limit * self.agent_window_multiplier).max(self.agent_window_floor)
    }
}

fn read_env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable config override");
            None
        }
    }
}

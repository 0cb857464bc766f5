//! Key layout for the shared indexed store.
//!
//! Every listable entity family pairs a `<prefix>:<id>` record key with a
//! sorted-set index scored by creation time. Queues are plain lists.

/// Sorted set: score = agent created_at, member = agent name.
pub const AGENTS_INDEX: &str = "agents_index";
/// Sorted set: score = result timestamp, member = job id.
pub const RESULTS_INDEX: &str = "results_index";
/// Sorted set: score = workflow created_at, member = workflow id.
pub const WORKFLOWS_INDEX: &str = "workflows_index";
/// Sorted set: score = upload timestamp, member = upload id.
pub const UPLOADS_INDEX: &str = "uploads_index";

/// Normal-priority job queue.
pub const QUEUE: &str = "queue";
/// High-priority job queue.
pub const QUEUE_HIGH: &str = "queue_high";
/// Low-priority job queue.
pub const QUEUE_LOW: &str = "queue_low";
/// All queues, for totals.
pub const ALL_QUEUES: [&str; 3] = [QUEUE, QUEUE_HIGH, QUEUE_LOW];

/// Liveness key refreshed by external workers (short TTL).
pub const WORKER_HEARTBEAT: &str = "worker:heartbeat";
/// Cached analytics snapshot (short TTL).
pub const ANALYTICS_SNAPSHOT: &str = "analytics_snapshot";

pub fn agent_key(name: &str) -> String {
    format!("agent:{name}")
}

pub fn result_key(job_id: &str) -> String {
    format!("result:{job_id}")
}

pub fn workflow_key(workflow_id: &str) -> String {
    format!("workflow:{workflow_id}")
}

pub fn upload_key(upload_id: &str) -> String {
    format!("upload:{upload_id}")
}

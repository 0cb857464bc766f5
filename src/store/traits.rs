//! The shared indexed store contract.
//!
//! A minimal key-value surface with sorted-set and list primitives — enough
//! to express every index and queue the engine needs, without committing to
//! one storage product. Entity bodies are always UTF-8 JSON text.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Backend-agnostic indexed store.
///
/// Individual operations are serialized by the backend; the engine holds no
/// additional locks and never spans a transaction across calls, so
/// read-modify-write sequences built on top of this trait are
/// last-writer-wins.
#[async_trait]
pub trait IndexedStore: Send + Sync {
    // ── Strings ─────────────────────────────────────────────────────

    /// Get a value, or `None` if missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a value with no expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Set a value that expires after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Whether a live (non-expired) value exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    // ── Sorted sets ─────────────────────────────────────────────────

    /// Add a member with a score, replacing any previous score.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    /// Members ordered by score descending, positions `start..=stop`
    /// (`stop = -1` means through the end).
    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError>;

    /// Count of members with score in `[min, max]`.
    async fn zcount(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError>;

    /// Total member count.
    async fn zcard(&self, key: &str) -> Result<u64, StoreError>;

    /// Remove a member. Returns whether it was present.
    async fn zrem(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    // ── Lists (queues) ──────────────────────────────────────────────

    /// Push a value onto the head of a list. Never blocks.
    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Current list length.
    async fn llen(&self, key: &str) -> Result<u64, StoreError>;

    /// Blocking pop from the tail of a list (FIFO relative to `lpush`),
    /// waiting up to `timeout`. Returns `None` on timeout. This is the
    /// worker-side dequeue; the engine itself only pushes.
    async fn brpop(&self, key: &str, timeout: Duration) -> Result<Option<String>, StoreError>;

    // ── Liveness ────────────────────────────────────────────────────

    /// Round-trip check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

//! libSQL store backend — durable `IndexedStore` implementation.
//!
//! Maps the key-value / sorted-set / queue contract onto three tables.
//! Supports local file and in-memory databases; schema is created on open.
//! Expiry is enforced lazily: reads treat a past `expires_at` as absent and
//! evict the row.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::info;

use crate::error::StoreError;
use crate::store::traits::IndexedStore;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expires_at INTEGER
    );

    CREATE TABLE IF NOT EXISTS zset (
        key TEXT NOT NULL,
        member TEXT NOT NULL,
        score REAL NOT NULL,
        PRIMARY KEY (key, member)
    );
    CREATE INDEX IF NOT EXISTS idx_zset_key_score ON zset(key, score);

    CREATE TABLE IF NOT EXISTS queue (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        key TEXT NOT NULL,
        value TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_queue_key_seq ON queue(key, seq);
"#;

/// How often a blocking pop re-checks the queue table.
const POP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// libSQL-backed [`IndexedStore`].
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("Failed to create store directory: {e}"))
            })?;
        }
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open database: {e}")))?;
        let store = Self::from_db(db).await?;
        info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_db(db).await
    }

    async fn from_db(db: Database) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Unavailable(format!("Failed to create connection: {e}")))?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| StoreError::Query(format!("schema init: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn try_pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        loop {
            let mut rows = conn
                .query(
                    "SELECT seq, value FROM queue WHERE key = ?1 ORDER BY seq ASC LIMIT 1",
                    params![key],
                )
                .await
                .map_err(|e| StoreError::Query(format!("pop select: {e}")))?;
            let Some(row) = rows
                .next()
                .await
                .map_err(|e| StoreError::Query(format!("pop row: {e}")))?
            else {
                return Ok(None);
            };
            let seq: i64 = row
                .get(0)
                .map_err(|e| StoreError::Query(format!("pop seq: {e}")))?;
            let value: String = row
                .get(1)
                .map_err(|e| StoreError::Query(format!("pop value: {e}")))?;
            let deleted = conn
                .execute("DELETE FROM queue WHERE seq = ?1", params![seq])
                .await
                .map_err(|e| StoreError::Query(format!("pop delete: {e}")))?;
            // Zero rows means a concurrent popper claimed this seq first.
            if deleted > 0 {
                return Ok(Some(value));
            }
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl IndexedStore for LibSqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value, expires_at FROM kv WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?;
        let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("get row: {e}")))?
        else {
            return Ok(None);
        };
        let value: String = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("get value: {e}")))?;
        let expires_at: Option<i64> = row.get(1).ok();
        if let Some(at) = expires_at {
            if now_millis() >= at {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                    .await
                    .map_err(|e| StoreError::Query(format!("get evict: {e}")))?;
                return Ok(None);
            }
        }
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, NULL)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, expires_at = NULL",
                params![key, value],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set: {e}")))?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = now_millis() + ttl.as_millis() as i64;
        self.conn()
            .execute(
                "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, expires_at = ?3",
                params![key, value, expires_at],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_ex: {e}")))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.conn();
        let kv = conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("delete kv: {e}")))?;
        let zset = conn
            .execute("DELETE FROM zset WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("delete zset: {e}")))?;
        let queue = conn
            .execute("DELETE FROM queue WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("delete queue: {e}")))?;
        Ok(kv + zset + queue > 0)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO zset (key, member, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, member) DO UPDATE SET score = ?3",
                params![key, member, score],
            )
            .await
            .map_err(|e| StoreError::Query(format!("zadd: {e}")))?;
        Ok(())
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        // LIMIT -1 means unbounded in SQLite, matching stop = -1.
        let (limit, offset) = if stop < 0 {
            (-1_i64, start.max(0))
        } else if stop < start {
            return Ok(Vec::new());
        } else {
            (stop - start + 1, start.max(0))
        };
        let mut rows = self
            .conn()
            .query(
                "SELECT member FROM zset WHERE key = ?1
                 ORDER BY score DESC, member DESC LIMIT ?2 OFFSET ?3",
                params![key, limit, offset],
            )
            .await
            .map_err(|e| StoreError::Query(format!("zrevrange: {e}")))?;
        let mut members = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("zrevrange row: {e}")))?
        {
            members.push(
                row.get(0)
                    .map_err(|e| StoreError::Query(format!("zrevrange member: {e}")))?,
            );
        }
        Ok(members)
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM zset WHERE key = ?1 AND score >= ?2 AND score <= ?3",
                params![key, min, max],
            )
            .await
            .map_err(|e| StoreError::Query(format!("zcount: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("zcount row: {e}")))?
            .ok_or_else(|| StoreError::Query("zcount returned no row".into()))?;
        let count: i64 = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("zcount value: {e}")))?;
        Ok(count as u64)
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        self.zcount(key, f64::MIN, f64::MAX).await
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute(
                "DELETE FROM zset WHERE key = ?1 AND member = ?2",
                params![key, member],
            )
            .await
            .map_err(|e| StoreError::Query(format!("zrem: {e}")))?;
        Ok(removed > 0)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO queue (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .await
            .map_err(|e| StoreError::Query(format!("lpush: {e}")))?;
        Ok(())
    }

    async fn llen(&self, key: &str) -> Result<u64, StoreError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM queue WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("llen: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("llen row: {e}")))?
            .ok_or_else(|| StoreError::Query("llen returned no row".into()))?;
        let count: i64 = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("llen value: {e}")))?;
        Ok(count as u64)
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> Result<Option<String>, StoreError> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(value) = self.try_pop(key).await? {
                return Ok(Some(value));
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POP_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.conn()
            .query("SELECT 1", ())
            .await
            .map_err(|e| StoreError::Unavailable(format!("ping: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kv_round_trip_and_overwrite() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
        assert!(store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_key_reads_as_absent() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store
            .set_ex("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zset_ordering_and_counts() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store.zadd("idx", "a", 1.0).await.unwrap();
        store.zadd("idx", "b", 3.0).await.unwrap();
        store.zadd("idx", "c", 2.0).await.unwrap();
        assert_eq!(
            store.zrevrange("idx", 0, -1).await.unwrap(),
            vec!["b", "c", "a"]
        );
        assert_eq!(store.zcount("idx", 2.0, 3.0).await.unwrap(), 2);
        assert_eq!(store.zcard("idx").await.unwrap(), 3);
        assert!(store.zrem("idx", "c").await.unwrap());
        assert_eq!(store.zcard("idx").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store.lpush("q", "first").await.unwrap();
        store.lpush("q", "second").await.unwrap();
        let a = store.brpop("q", Duration::from_millis(100)).await.unwrap();
        let b = store.brpop("q", Duration::from_millis(100)).await.unwrap();
        assert_eq!(a.as_deref(), Some("first"));
        assert_eq!(b.as_deref(), Some("second"));
        assert_eq!(
            store.brpop("q", Duration::from_millis(20)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            store.set("k", "v").await.unwrap();
        }
        let store = LibSqlStore::new_local(&path).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}

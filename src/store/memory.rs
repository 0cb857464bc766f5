//! In-memory store backend.
//!
//! Implements the full [`IndexedStore`] contract over plain maps behind a
//! `tokio::sync::RwLock`. Used by the test suite and available to embedders
//! who don't need durability. TTLs are enforced lazily on read, matching the
//! behavior callers see from an expiring-key store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};

use crate::error::StoreError;
use crate::store::traits::IndexedStore;

struct KvEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
struct Inner {
    kv: HashMap<String, KvEntry>,
    zsets: HashMap<String, HashMap<String, f64>>,
    lists: HashMap<String, VecDeque<String>>,
    // One notifier per queue; a push must not wake waiters on other queues.
    push_notify: HashMap<String, Arc<Notify>>,
}

/// In-memory [`IndexedStore`] backend.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    async fn try_pop(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.write().await;
        inner.lists.get_mut(key).and_then(VecDeque::pop_back)
    }

    async fn notifier(&self, key: &str) -> Arc<Notify> {
        let mut inner = self.inner.write().await;
        inner
            .push_notify
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        {
            let inner = self.inner.read().await;
            match inner.kv.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }
        // Expired — evict under the write lock.
        let mut inner = self.inner.write().await;
        if inner.kv.get(key).is_some_and(KvEntry::is_expired) {
            inner.kv.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.kv.insert(
            key.to_string(),
            KvEntry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.kv.insert(
            key.to_string(),
            KvEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let had_kv = inner.kv.remove(key).is_some();
        let had_zset = inner.zsets.remove(key).is_some();
        let had_list = inner.lists.remove(key).is_some();
        Ok(had_kv || had_zset || had_list)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        let Some(zset) = inner.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let mut members: Vec<(&String, f64)> = zset.iter().map(|(m, s)| (m, *s)).collect();
        // Score descending, reverse-lexicographic member order on ties.
        members.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(a.0))
        });

        let len = members.len() as i64;
        let stop = if stop < 0 { len + stop } else { stop };
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        let start = start.max(0) as usize;
        let stop = stop.min(len - 1) as usize;
        Ok(members[start..=stop]
            .iter()
            .map(|(m, _)| (*m).clone())
            .collect())
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .zsets
            .get(key)
            .map(|z| z.values().filter(|s| **s >= min && **s <= max).count() as u64)
            .unwrap_or(0))
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.zsets.get(key).map(|z| z.len() as u64).unwrap_or(0))
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .zsets
            .get_mut(key)
            .is_some_and(|z| z.remove(member).is_some()))
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let notify = {
            let mut inner = self.inner.write().await;
            inner
                .lists
                .entry(key.to_string())
                .or_default()
                .push_front(value.to_string());
            inner
                .push_notify
                .entry(key.to_string())
                .or_default()
                .clone()
        };
        notify.notify_one();
        Ok(())
    }

    async fn llen(&self, key: &str) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.lists.get(key).map(|l| l.len() as u64).unwrap_or(0))
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> Result<Option<String>, StoreError> {
        let deadline = Instant::now() + timeout;
        // Grab the notifier up front; notify_one buffers a permit, so a push
        // landing between try_pop and notified() is not lost.
        let notify = self.notifier(key).await;
        loop {
            if let Some(value) = self.try_pop(key).await {
                return Ok(Some(value));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let wait = notify.notified();
            if tokio::time::timeout(deadline - now, wait).await.is_err() {
                return Ok(self.try_pop(key).await);
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

//! Upload metadata records — the fourth indexed entity family.
//!
//! Only the metadata and its index live here; byte handling belongs to the
//! front-end layer. Records expire after the configured retention window
//! (default seven days) while index entries are cleaned lazily on list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::store::keys::{self, UPLOADS_INDEX};
use crate::store::traits::IndexedStore;

/// Metadata about one uploaded archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub upload_id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Store over `upload:<id>` records plus the `uploads_index` sorted set.
#[derive(Clone)]
pub struct UploadIndex {
    store: Arc<dyn IndexedStore>,
    config: EngineConfig,
}

impl UploadIndex {
    pub fn new(store: Arc<dyn IndexedStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Record an upload's metadata with the retention TTL and index it.
    pub async fn record(
        &self,
        filename: &str,
        size_bytes: u64,
    ) -> Result<UploadRecord, StoreError> {
        let record = UploadRecord {
            upload_id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            size_bytes,
            uploaded_at: Utc::now(),
        };
        self.store
            .set_ex(
                &keys::upload_key(&record.upload_id),
                &serde_json::to_string(&record)?,
                self.config.upload_ttl,
            )
            .await?;
        self.store
            .zadd(
                UPLOADS_INDEX,
                &record.upload_id,
                record.uploaded_at.timestamp_millis() as f64 / 1000.0,
            )
            .await?;
        Ok(record)
    }

    pub async fn get(&self, upload_id: &str) -> Result<Option<UploadRecord>, StoreError> {
        match self.store.get(&keys::upload_key(upload_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Recent uploads, most recent first; stale index entries are dropped.
    pub async fn list(&self, limit: usize) -> Result<Vec<UploadRecord>, StoreError> {
        let ids = self
            .store
            .zrevrange(UPLOADS_INDEX, 0, limit as i64 - 1)
            .await?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get(&keys::upload_key(&id)).await? {
                Some(raw) => records.push(serde_json::from_str(&raw)?),
                None => debug!(upload_id = %id, "Dropping stale upload index entry"),
            }
        }
        Ok(records)
    }
}

//! One collection embedded in the shared remote document.
//!
//! The remote store only supports whole-document replacement, so every write
//! is a read-modify-write: fetch the full document, replace this adapter's key,
//! and store the result with every other key untouched. Those cycles run
//! through a [`WriteLane`] so that at most one is in flight per lane and they
//! apply in the order they were issued.

use super::transport::{Document, DocumentTransport};
use super::{StorageAdapter, merge_by_id, push_unique, remove_by_id};
use crate::record::now_ms;
use async_trait::async_trait;
use eyre::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Single-lane FIFO queue for read-modify-write cycles
///
/// `tokio::sync::Mutex` grants the lock in request order, which gives the
/// queue its call-order guarantee. Adapters sharing a lane are serialized
/// against each other as well.
pub type WriteLane = Arc<Mutex<()>>;

pub fn new_lane() -> WriteLane {
    Arc::new(Mutex::new(()))
}

pub struct RemoteAdapter {
    key: String,
    transport: Arc<dyn DocumentTransport>,
    lane: WriteLane,
}

impl RemoteAdapter {
    pub fn new(key: impl Into<String>, transport: Arc<dyn DocumentTransport>, lane: WriteLane) -> Self {
        Self {
            key: key.into(),
            transport,
            lane,
        }
    }

    /// Adapter with a lane of its own
    pub fn standalone(key: impl Into<String>, transport: Arc<dyn DocumentTransport>) -> Self {
        Self::new(key, transport, new_lane())
    }

    fn collection(&self, document: &Document) -> Vec<Value> {
        match document.get(&self.key) {
            Some(Value::Array(records)) => records.clone(),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                warn!(key = %self.key, kind = ?other, "Remote collection is not an array, treating as empty");
                Vec::new()
            }
        }
    }

    /// Run `edit` against the freshest copy of this collection and write it back
    ///
    /// `edit` returns its result and whether the collection changed; unchanged
    /// collections are not written. The lane is held from the fetch until the
    /// store settles, success or failure.
    async fn read_modify_write<T, F>(&self, edit: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Vec<Value>) -> (T, bool) + Send,
    {
        let _turn = self.lane.lock().await;

        let mut document = self.transport.fetch().await?;
        let mut records = self.collection(&document);

        let (result, changed) = edit(&mut records);
        if !changed {
            return Ok(result);
        }

        let count = records.len();
        document.insert(self.key.clone(), Value::Array(records));
        self.transport.store(&document).await?;

        debug!(
            key = %self.key,
            count,
            preserved_keys = document.len().saturating_sub(1),
            "Saved remote collection"
        );
        Ok(result)
    }
}

#[async_trait]
impl StorageAdapter for RemoteAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn get_all(&self) -> Vec<Value> {
        match self.transport.fetch().await {
            Ok(document) => self.collection(&document),
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to fetch remote collection");
                Vec::new()
            }
        }
    }

    async fn save(&self, records: Vec<Value>) -> bool {
        let result = self
            .read_modify_write(move |current| {
                *current = records;
                ((), true)
            })
            .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to save remote collection");
                false
            }
        }
    }

    async fn add(&self, record: Value) -> Option<Value> {
        let result = self
            .read_modify_write(move |current| {
                let added = push_unique(current, record.clone());
                (added.then_some(record), added)
            })
            .await;

        match result {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                warn!(key = %self.key, "Record with the same ID already exists, not adding");
                None
            }
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to add remote record");
                None
            }
        }
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Option<Value> {
        let now = now_ms();
        let result = self
            .read_modify_write(|current| {
                let merged = merge_by_id(current, id, &fields, now);
                let changed = merged.is_some();
                (merged, changed)
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!(key = %self.key, id, error = ?e, "Failed to update remote record");
            None
        })
    }

    async fn delete(&self, id: &str) -> bool {
        let result = self
            .read_modify_write(|current| ((), remove_by_id(current, id)))
            .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, id, error = ?e, "Failed to delete remote record");
                false
            }
        }
    }

    async fn clear(&self) -> bool {
        self.save(Vec::new()).await
    }
}

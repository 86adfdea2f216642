//! Uniform CRUD contract over a single collection, with local and remote backends.
//!
//! Every operation degrades to a failure value (`false`, `None`, or an empty
//! `Vec`) instead of returning an error; the cause is logged where it happens.

pub mod factory;
pub mod local;
pub mod remote;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::StorageKind;
use crate::record::{merge_fields, record_id};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use factory::StorageFactory;
pub use local::LocalAdapter;
pub use remote::{RemoteAdapter, WriteLane};
pub use transport::{Document, DocumentTransport, HttpTransport, get_headers};

/// CRUD over one collection key
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Collection key this adapter is bound to
    fn key(&self) -> &str;

    /// Full collection; empty when absent or unreadable
    async fn get_all(&self) -> Vec<Value>;

    /// Replace the whole collection
    async fn save(&self, records: Vec<Value>) -> bool;

    /// Append a record, returning it on success
    async fn add(&self, record: Value) -> Option<Value>;

    /// Shallow-merge `fields` into the record with `id`; `None` if absent
    async fn update(&self, id: &str, fields: Map<String, Value>) -> Option<Value>;

    /// Remove by ID; absent IDs still succeed
    async fn delete(&self, id: &str) -> bool;

    /// Remove the whole collection
    async fn clear(&self) -> bool;
}

/// Backend chosen by the factory
pub enum Adapter {
    Local(LocalAdapter),
    Remote(RemoteAdapter),
}

impl Adapter {
    pub fn kind(&self) -> StorageKind {
        match self {
            Adapter::Local(_) => StorageKind::Local,
            Adapter::Remote(_) => StorageKind::Cloud,
        }
    }
}

#[async_trait]
impl StorageAdapter for Adapter {
    fn key(&self) -> &str {
        match self {
            Adapter::Local(a) => a.key(),
            Adapter::Remote(a) => a.key(),
        }
    }

    async fn get_all(&self) -> Vec<Value> {
        match self {
            Adapter::Local(a) => a.get_all().await,
            Adapter::Remote(a) => a.get_all().await,
        }
    }

    async fn save(&self, records: Vec<Value>) -> bool {
        match self {
            Adapter::Local(a) => a.save(records).await,
            Adapter::Remote(a) => a.save(records).await,
        }
    }

    async fn add(&self, record: Value) -> Option<Value> {
        match self {
            Adapter::Local(a) => a.add(record).await,
            Adapter::Remote(a) => a.add(record).await,
        }
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Option<Value> {
        match self {
            Adapter::Local(a) => a.update(id, fields).await,
            Adapter::Remote(a) => a.update(id, fields).await,
        }
    }

    async fn delete(&self, id: &str) -> bool {
        match self {
            Adapter::Local(a) => a.delete(id).await,
            Adapter::Remote(a) => a.delete(id).await,
        }
    }

    async fn clear(&self) -> bool {
        match self {
            Adapter::Local(a) => a.clear().await,
            Adapter::Remote(a) => a.clear().await,
        }
    }
}

// In-memory edits shared by both backends. Each returns whether the list changed.

/// Append unless another record already has the same ID
fn push_unique(records: &mut Vec<Value>, record: Value) -> bool {
    if let Some(id) = record_id(&record) {
        if records.iter().any(|r| record_id(r) == Some(id)) {
            return false;
        }
    }
    records.push(record);
    true
}

/// Merge `fields` into the record with `id`, returning the merged record
fn merge_by_id(records: &mut [Value], id: &str, fields: &Map<String, Value>, now: i64) -> Option<Value> {
    let record = records.iter_mut().find(|r| record_id(r) == Some(id))?;
    *record = merge_fields(record, fields, now);
    Some(record.clone())
}

fn remove_by_id(records: &mut Vec<Value>, id: &str) -> bool {
    let before = records.len();
    records.retain(|r| record_id(r) != Some(id));
    records.len() != before
}

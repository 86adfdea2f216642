// Collection stored as a JSON array in one local slot

use super::{StorageAdapter, merge_by_id, push_unique, remove_by_id};
use crate::record::now_ms;
use crate::store::LocalStore;
use async_trait::async_trait;
use eyre::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub struct LocalAdapter {
    key: String,
    store: LocalStore,
}

impl LocalAdapter {
    pub fn new(key: impl Into<String>, store: LocalStore) -> Self {
        Self { key: key.into(), store }
    }

    /// Current contents; a missing or corrupt slot reads as empty
    fn read(&self) -> Vec<Value> {
        let json = match self.store.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to read local collection");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Value>>(&json) {
            Ok(records) => records,
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Corrupt local collection, treating as empty");
                Vec::new()
            }
        }
    }

    fn write(&self, records: &[Value]) -> Result<()> {
        let json = serde_json::to_string(records).context("Failed to serialize collection")?;
        self.store.set(&self.key, &json)?;
        debug!(key = %self.key, count = records.len(), "Saved local collection");
        Ok(())
    }

    fn write_or_log(&self, records: &[Value]) -> bool {
        match self.write(records) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to save local collection");
                false
            }
        }
    }
}

#[async_trait]
impl StorageAdapter for LocalAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn get_all(&self) -> Vec<Value> {
        self.read()
    }

    async fn save(&self, records: Vec<Value>) -> bool {
        self.write_or_log(&records)
    }

    async fn add(&self, record: Value) -> Option<Value> {
        let mut records = self.read();
        if !push_unique(&mut records, record.clone()) {
            warn!(key = %self.key, "Record with the same ID already exists, not adding");
            return None;
        }
        self.write_or_log(&records).then_some(record)
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Option<Value> {
        let mut records = self.read();
        let merged = merge_by_id(&mut records, id, &fields, now_ms())?;
        self.write_or_log(&records).then_some(merged)
    }

    async fn delete(&self, id: &str) -> bool {
        let mut records = self.read();
        if !remove_by_id(&mut records, id) {
            return true;
        }
        self.write_or_log(&records)
    }

    async fn clear(&self) -> bool {
        match self.store.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to clear local collection");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn adapter(key: &str) -> LocalAdapter {
        LocalAdapter::new(key, LocalStore::in_memory().unwrap())
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_all_never_written_is_empty() {
        assert!(adapter("tasks").get_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_then_get_all() {
        let tasks = adapter("tasks");

        let added = tasks.add(json!({"id": "t1", "title": "x"})).await;
        assert_eq!(added, Some(json!({"id": "t1", "title": "x"})));
        assert_eq!(tasks.get_all().await, vec![json!({"id": "t1", "title": "x"})]);
    }

    #[tokio::test]
    async fn test_add_duplicate_id_fails() {
        let tasks = adapter("tasks");
        tasks.add(json!({"id": "t1"})).await.unwrap();

        assert_eq!(tasks.add(json!({"id": "t1", "title": "again"})).await, None);
        assert_eq!(tasks.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_insertion_order_preserved() {
        let tasks = adapter("tasks");
        for id in ["c", "a", "b"] {
            tasks.add(json!({ "id": id })).await.unwrap();
        }

        let ids: Vec<_> = tasks
            .get_all()
            .await
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let tasks = adapter("tasks");
        let data = vec![json!({"id": "t1", "tags": ["a"]}), json!({"id": "t2", "order": 1})];

        assert!(tasks.save(data.clone()).await);
        assert_eq!(tasks.get_all().await, data);
    }

    #[tokio::test]
    async fn test_update_merges_partial_fields() {
        let tasks = adapter("tasks");
        tasks
            .add(json!({"id": "t1", "title": "x", "status": "todo", "updatedAt": 1}))
            .await
            .unwrap();

        let merged = tasks.update("t1", fields(json!({"status": "done"}))).await.unwrap();

        assert_eq!(merged["title"], "x");
        assert_eq!(merged["status"], "done");
        assert!(merged["updatedAt"].as_i64().unwrap() > 1);
        assert_eq!(tasks.get_all().await, vec![merged]);
    }

    #[tokio::test]
    async fn test_update_cannot_change_id() {
        let tasks = adapter("tasks");
        tasks.add(json!({"id": "t1", "title": "x"})).await.unwrap();
        tasks.add(json!({"id": "t2"})).await.unwrap();

        let merged = tasks.update("t1", fields(json!({"id": "t2", "title": "y"}))).await.unwrap();
        assert_eq!(merged["id"], "t1");
        assert_eq!(merged["title"], "y");

        let ids: Vec<_> = tasks.get_all().await.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("t1"), json!("t2")]);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let tasks = adapter("tasks");
        tasks.add(json!({"id": "t1"})).await.unwrap();

        assert_eq!(tasks.update("nope", fields(json!({"title": "y"}))).await, None);
        assert_eq!(tasks.get_all().await, vec![json!({"id": "t1"})]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let tasks = adapter("tasks");
        tasks.add(json!({"id": "t1"})).await.unwrap();
        tasks.add(json!({"id": "t2"})).await.unwrap();

        assert!(tasks.delete("t1").await);
        assert!(tasks.delete("t1").await);
        assert!(tasks.delete("never-existed").await);
        assert_eq!(tasks.get_all().await, vec![json!({"id": "t2"})]);
    }

    #[tokio::test]
    async fn test_clear_removes_slot() {
        let store = LocalStore::in_memory().unwrap();
        let tasks = LocalAdapter::new("tasks", store.clone());
        tasks.add(json!({"id": "t1"})).await.unwrap();

        assert!(tasks.clear().await);
        assert!(tasks.get_all().await.is_empty());
        assert_eq!(store.get("tasks").unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_slot_reads_as_empty() {
        let store = LocalStore::in_memory().unwrap();
        store.set("tasks", "{definitely not an array").unwrap();

        let tasks = LocalAdapter::new("tasks", store);
        assert!(tasks.get_all().await.is_empty());

        // Next write recovers the slot
        tasks.add(json!({"id": "t1"})).await.unwrap();
        assert_eq!(tasks.get_all().await, vec![json!({"id": "t1"})]);
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let store = LocalStore::in_memory().unwrap();
        let tasks = LocalAdapter::new("tasks", store.clone());
        let groups = LocalAdapter::new("groups", store);

        groups.save(vec![json!({"id": "g1"})]).await;
        tasks.save(vec![json!({"id": "t1"})]).await;
        tasks.clear().await;

        assert_eq!(groups.get_all().await, vec![json!({"id": "g1"})]);
    }

    #[tokio::test]
    async fn test_persists_on_disk() {
        let temp = TempDir::new().unwrap();
        {
            let tasks = LocalAdapter::new("tasks", LocalStore::open(temp.path()).unwrap());
            tasks.add(json!({"id": "t1"})).await.unwrap();
        }

        let tasks = LocalAdapter::new("tasks", LocalStore::open(temp.path()).unwrap());
        assert_eq!(tasks.get_all().await, vec![json!({"id": "t1"})]);
    }
}

// Group collection service

use crate::collection::Collection;
use crate::models::{DEFAULT_GROUPS, Group};
use crate::record::record_id;
use crate::storage::StorageFactory;
use eyre::{Result, eyre};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::info;

const ORDER_FIELD: &str = "order";

pub struct GroupService {
    groups: Collection<Group>,
}

impl GroupService {
    pub fn new(factory: &StorageFactory) -> Self {
        Self::from_collection(Collection::new(factory))
    }

    pub fn from_collection(groups: Collection<Group>) -> Self {
        Self { groups }
    }

    pub fn collection(&self) -> &Collection<Group> {
        &self.groups
    }

    /// Groups as stored
    pub async fn all(&self) -> Vec<Group> {
        self.groups.all().await
    }

    /// Groups sorted by their `order` field
    pub async fn ordered(&self) -> Vec<Group> {
        let mut groups = self.all().await;
        groups.sort_by_key(|g| g.order);
        groups
    }

    pub async fn get(&self, id: &str) -> Option<Group> {
        self.groups.get(id).await
    }

    /// Seed the default groups into an empty collection
    ///
    /// Returns whether seeding happened.
    pub async fn init_default(&self) -> Result<bool> {
        if !self.groups.raw().await.is_empty() {
            return Ok(false);
        }

        let defaults: Vec<Group> = DEFAULT_GROUPS
            .iter()
            .enumerate()
            .map(|(order, name)| Group::new(*name, order as i64))
            .collect();
        self.groups.replace(&defaults).await?;

        info!(count = defaults.len(), "Seeded default groups");
        Ok(true)
    }

    /// Add a group at the end of the current order
    pub async fn add(&self, name: &str) -> Result<Group> {
        let order = self.groups.raw().await.len() as i64;
        let group = Group::new(name.trim(), order);

        let errors = group.validate();
        if !errors.is_empty() {
            return Err(eyre!("Invalid group: {}", errors.join("; ")));
        }

        let group = self.groups.add(group).await?;
        info!(id = %group.id, name = %group.name, "Added group");
        Ok(group)
    }

    pub async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<Option<Group>> {
        self.groups.update(id, fields).await
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<Option<Group>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(eyre!("Group name cannot be empty"));
        }

        let mut fields = Map::new();
        fields.insert("name".into(), Value::from(name));
        self.update(id, fields).await
    }

    /// Remove a group and renumber the rest 0..n
    ///
    /// Works on the stored records, so groups that don't decode are kept.
    /// Tasks in the group are left alone; see `Board::delete_group_cascade`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut remaining: Vec<Value> = self
            .ordered_raw()
            .await
            .into_iter()
            .filter(|record| record_id(record) != Some(id))
            .collect();
        renumber(&mut remaining);

        let count = remaining.len();
        self.groups.replace_raw(remaining).await?;
        info!(id, remaining = count, "Deleted group");
        Ok(())
    }

    /// Assign `order` to follow `ids`
    ///
    /// Unknown and repeated IDs are ignored. Groups missing from `ids` keep
    /// their relative order after the listed ones.
    pub async fn reorder(&self, ids: &[String]) -> Result<Vec<Group>> {
        let mut remaining = self.ordered_raw().await;
        let mut seen = HashSet::new();
        let mut reordered = Vec::with_capacity(remaining.len());

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(pos) = remaining.iter().position(|r| record_id(r) == Some(id.as_str())) {
                reordered.push(remaining.remove(pos));
            }
        }
        reordered.extend(remaining);
        renumber(&mut reordered);

        self.groups.replace_raw(reordered.clone()).await?;
        Ok(self.groups.decode_all(reordered))
    }

    /// Stored records sorted by `order`, undecodable ones included
    async fn ordered_raw(&self) -> Vec<Value> {
        let mut records = self.groups.raw().await;
        records.sort_by_key(raw_order);
        records
    }
}

fn raw_order(record: &Value) -> i64 {
    record.get(ORDER_FIELD).and_then(Value::as_i64).unwrap_or(0)
}

fn renumber(records: &mut [Value]) {
    for (order, record) in records.iter_mut().enumerate() {
        if let Value::Object(fields) = record {
            fields.insert(ORDER_FIELD.to_string(), Value::from(order as i64));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::LocalStore;
    use serde_json::json;

    fn service() -> GroupService {
        let factory = StorageFactory::new(Config::default(), LocalStore::in_memory().unwrap());
        GroupService::new(&factory)
    }

    fn names(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(|g| g.name.as_str()).collect()
    }

    fn orders(groups: &[Group]) -> Vec<i64> {
        groups.iter().map(|g| g.order).collect()
    }

    #[tokio::test]
    async fn test_init_default_seeds_once() {
        let groups = service();

        assert!(groups.init_default().await.unwrap());
        let seeded = groups.ordered().await;
        assert_eq!(names(&seeded), DEFAULT_GROUPS.to_vec());
        assert_eq!(orders(&seeded), vec![0, 1, 2]);

        assert!(!groups.init_default().await.unwrap());
        assert_eq!(groups.all().await, seeded);
    }

    #[tokio::test]
    async fn test_init_default_skips_non_empty() {
        let groups = service();
        groups.add("Ops").await.unwrap();

        assert!(!groups.init_default().await.unwrap());
        assert_eq!(names(&groups.all().await), vec!["Ops"]);
    }

    #[tokio::test]
    async fn test_add_assigns_next_order() {
        let groups = service();
        let a = groups.add("A").await.unwrap();
        let b = groups.add(" B ").await.unwrap();

        assert_eq!(a.order, 0);
        assert_eq!(b.order, 1);
        assert_eq!(b.name, "B");
        assert!(groups.add("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_rename() {
        let groups = service();
        let a = groups.add("A").await.unwrap();

        let renamed = groups.rename(&a.id, "Alpha").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Alpha");
        assert_eq!(renamed.order, a.order);
        assert_eq!(renamed.color, a.color);

        assert_eq!(groups.rename("missing", "x").await.unwrap(), None);
        assert!(groups.rename(&a.id, " ").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_renumbers() {
        let groups = service();
        let a = groups.add("A").await.unwrap();
        let b = groups.add("B").await.unwrap();
        groups.add("C").await.unwrap();

        groups.delete(&b.id).await.unwrap();
        let left = groups.ordered().await;
        assert_eq!(names(&left), vec!["A", "C"]);
        assert_eq!(orders(&left), vec![0, 1]);

        // Absent ID leaves the collection as is
        groups.delete("missing").await.unwrap();
        assert_eq!(groups.ordered().await.len(), 2);
        assert_eq!(groups.get(&a.id).await.unwrap().order, 0);
    }

    #[tokio::test]
    async fn test_reorder() {
        let groups = service();
        let a = groups.add("A").await.unwrap();
        let b = groups.add("B").await.unwrap();
        let c = groups.add("C").await.unwrap();

        let ids = vec![c.id.clone(), a.id.clone(), b.id.clone()];
        let reordered = groups.reorder(&ids).await.unwrap();

        assert_eq!(names(&reordered), vec!["C", "A", "B"]);
        assert_eq!(orders(&groups.ordered().await), vec![0, 1, 2]);
        assert_eq!(names(&groups.ordered().await), vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_delete_and_reorder_keep_records_that_do_not_decode() {
        let groups = service();
        let stored = vec![
            json!({"id": "g1", "name": "A", "order": 0, "createdAt": 1}),
            json!({"id": "g2", "name": "B", "order": 1}),
            json!({"id": "g3", "name": "C", "order": 2, "createdAt": 1}),
        ];
        groups.collection().replace_raw(stored).await.unwrap();

        groups.delete("g3").await.unwrap();
        let raw = groups.collection().raw().await;
        assert_eq!(
            raw,
            vec![
                json!({"id": "g1", "name": "A", "order": 0, "createdAt": 1}),
                json!({"id": "g2", "name": "B", "order": 1}),
            ]
        );

        let reordered = groups.reorder(&["g2".to_string()]).await.unwrap();
        assert_eq!(names(&reordered), vec!["A"]);
        assert_eq!(reordered[0].order, 1);

        let raw = groups.collection().raw().await;
        assert_eq!(raw[0], json!({"id": "g2", "name": "B", "order": 0}));
        assert_eq!(raw[1]["id"], "g1");
    }

    #[tokio::test]
    async fn test_reorder_partial_and_unknown_ids() {
        let groups = service();
        let a = groups.add("A").await.unwrap();
        groups.add("B").await.unwrap();
        let c = groups.add("C").await.unwrap();

        let ids = vec![c.id.clone(), "ghost".to_string(), c.id.clone()];
        let reordered = groups.reorder(&ids).await.unwrap();

        assert_eq!(names(&reordered), vec!["C", "A", "B"]);
        assert_eq!(orders(&reordered), vec![0, 1, 2]);
        assert_eq!(groups.get(&a.id).await.unwrap().order, 1);
    }
}

// Task collection service

use crate::collection::Collection;
use crate::filter::Filter;
use crate::models::{GROUP_FIELD, Priority, Task, TaskStatus};
use crate::storage::StorageFactory;
use eyre::{Context, Result, eyre};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Partial edit of a task; `None` leaves a field as it is
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// An empty string clears the due date
    pub due_date: Option<String>,
    pub tags: Option<Vec<String>>,
    /// An empty string detaches the task from its group
    pub group_id: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
            && self.group_id.is_none()
    }

    /// Stored field names and values for the fields being changed
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        let mut fields = Map::new();

        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(eyre!("Task title cannot be empty"));
            }
            fields.insert("title".into(), Value::from(title.trim()));
        }
        if let Some(description) = &self.description {
            fields.insert("description".into(), Value::from(description.as_str()));
        }
        if let Some(status) = self.status {
            fields.insert("status".into(), serde_json::to_value(status)?);
        }
        if let Some(priority) = self.priority {
            fields.insert("priority".into(), serde_json::to_value(priority)?);
        }
        if let Some(due) = &self.due_date {
            let value = if due.is_empty() { Value::Null } else { Value::from(due.as_str()) };
            fields.insert("dueDate".into(), value);
        }
        if let Some(tags) = &self.tags {
            fields.insert("tags".into(), serde_json::to_value(tags)?);
        }
        if let Some(group_id) = &self.group_id {
            let value = if group_id.is_empty() { Value::Null } else { Value::from(group_id.as_str()) };
            fields.insert(GROUP_FIELD.into(), value);
        }

        Ok(fields)
    }
}

pub struct TaskService {
    tasks: Collection<Task>,
}

impl TaskService {
    pub fn new(factory: &StorageFactory) -> Self {
        Self::from_collection(Collection::new(factory))
    }

    pub fn from_collection(tasks: Collection<Task>) -> Self {
        Self { tasks }
    }

    pub fn collection(&self) -> &Collection<Task> {
        &self.tasks
    }

    pub async fn all(&self) -> Vec<Task> {
        self.tasks.all().await
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.get(id).await
    }

    pub async fn filter(&self, filters: &[Filter]) -> Vec<Task> {
        self.tasks.filter(filters).await
    }

    pub async fn by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.filter(&[Filter::eq("status", status.as_str())]).await
    }

    pub async fn by_group(&self, group_id: &str) -> Vec<Task> {
        self.filter(&[Filter::eq(GROUP_FIELD, group_id)]).await
    }

    /// Tasks split into board columns, most recently updated first
    pub async fn columns(&self) -> Vec<(TaskStatus, Vec<Task>)> {
        let tasks = self.all().await;
        TaskStatus::ALL
            .iter()
            .map(|&status| {
                let mut column: Vec<Task> = tasks.iter().filter(|t| t.status == status).cloned().collect();
                column.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                (status, column)
            })
            .collect()
    }

    pub async fn add(&self, task: Task) -> Result<Task> {
        let errors = task.validate();
        if !errors.is_empty() {
            return Err(eyre!("Invalid task: {}", errors.join("; ")));
        }

        let task = self.tasks.add(task).await?;
        info!(id = %task.id, title = %task.title, "Added task");
        Ok(task)
    }

    pub async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Option<Task>> {
        let fields = update.to_fields().context("Invalid task update")?;
        debug!(id, fields = fields.len(), "Updating task");
        self.tasks.update(id, fields).await
    }

    /// Move a task to another column
    pub async fn move_to(&self, id: &str, status: TaskStatus) -> Result<Option<Task>> {
        let update = TaskUpdate {
            status: Some(status),
            ..TaskUpdate::default()
        };
        self.update(id, &update).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.tasks.delete(id).await?;
        info!(id, "Deleted task");
        Ok(())
    }

    /// Delete every task in a group, returning how many were removed
    pub async fn delete_by_group(&self, group_id: &str) -> Result<usize> {
        let tasks = self.by_group(group_id).await;
        for task in &tasks {
            self.tasks.delete(&task.id).await?;
        }
        debug!(group_id, count = tasks.len(), "Deleted tasks in group");
        Ok(tasks.len())
    }

    pub async fn replace(&self, tasks: &[Task]) -> Result<()> {
        self.tasks.replace(tasks).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.tasks.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::LocalStore;

    fn service() -> TaskService {
        let factory = StorageFactory::new(Config::default(), LocalStore::in_memory().unwrap());
        TaskService::new(&factory)
    }

    fn task(title: &str, status: TaskStatus, group: Option<&str>) -> Task {
        let mut task = Task::new(title);
        task.status = status;
        task.group_id = group.map(str::to_string);
        task
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let tasks = service();
        let added = tasks.add(Task::new("Write docs")).await.unwrap();

        assert_eq!(tasks.get(&added.id).await, Some(added.clone()));
        assert_eq!(tasks.all().await, vec![added]);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_task() {
        let tasks = service();
        assert!(tasks.add(Task::new("  ")).await.is_err());
        assert!(tasks.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_by_status_and_group() {
        let tasks = service();
        let a = tasks.add(task("a", TaskStatus::Todo, Some("g1"))).await.unwrap();
        let b = tasks.add(task("b", TaskStatus::Done, Some("g1"))).await.unwrap();
        let c = tasks.add(task("c", TaskStatus::Todo, None)).await.unwrap();

        assert_eq!(tasks.by_status(TaskStatus::Todo).await, vec![a.clone(), c]);
        assert_eq!(tasks.by_group("g1").await, vec![a, b]);
        assert!(tasks.by_status(TaskStatus::Progress).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_only_given_fields() {
        let tasks = service();
        let mut original = Task::new("a");
        original.description = "keep me".to_string();
        original.tags = vec!["x".to_string()];
        original.updated_at = 1;
        let original = tasks.add(original).await.unwrap();

        let update = TaskUpdate {
            priority: Some(Priority::High),
            due_date: Some("2026-05-01".to_string()),
            ..TaskUpdate::default()
        };
        let updated = tasks.update(&original.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.due_date.as_deref(), Some("2026-05-01"));
        assert_eq!(updated.description, "keep me");
        assert_eq!(updated.tags, vec!["x"]);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > 1);
    }

    #[tokio::test]
    async fn test_update_clears_optional_fields() {
        let tasks = service();
        let mut original = task("a", TaskStatus::Todo, Some("g1"));
        original.due_date = Some("2026-01-01".to_string());
        let original = tasks.add(original).await.unwrap();

        let update = TaskUpdate {
            due_date: Some(String::new()),
            group_id: Some(String::new()),
            ..TaskUpdate::default()
        };
        let updated = tasks.update(&original.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.due_date, None);
        assert_eq!(updated.group_id, None);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_title() {
        let tasks = service();
        let original = tasks.add(Task::new("a")).await.unwrap();

        let update = TaskUpdate {
            title: Some(" ".to_string()),
            ..TaskUpdate::default()
        };
        assert!(tasks.update(&original.id, &update).await.is_err());
    }

    #[tokio::test]
    async fn test_move_to() {
        let tasks = service();
        let original = tasks.add(Task::new("a")).await.unwrap();

        let moved = tasks.move_to(&original.id, TaskStatus::Progress).await.unwrap().unwrap();
        assert_eq!(moved.status, TaskStatus::Progress);
        assert_eq!(tasks.move_to("missing", TaskStatus::Done).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_by_group() {
        let tasks = service();
        tasks.add(task("a", TaskStatus::Todo, Some("g1"))).await.unwrap();
        tasks.add(task("b", TaskStatus::Done, Some("g1"))).await.unwrap();
        let keep = tasks.add(task("c", TaskStatus::Todo, Some("g2"))).await.unwrap();

        assert_eq!(tasks.delete_by_group("g1").await.unwrap(), 2);
        assert_eq!(tasks.all().await, vec![keep]);
    }

    #[tokio::test]
    async fn test_columns_sorted_by_recent_update() {
        let tasks = service();
        let mut old = task("old", TaskStatus::Todo, None);
        old.updated_at = 100;
        let mut new = task("new", TaskStatus::Todo, None);
        new.updated_at = 200;
        tasks.add(old).await.unwrap();
        tasks.add(new).await.unwrap();

        let columns = tasks.columns().await;
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].0, TaskStatus::Todo);
        let titles: Vec<_> = columns[0].1.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "old"]);
        assert!(columns[2].1.is_empty());
    }

    #[tokio::test]
    async fn test_update_group_of_legacy_task() {
        let tasks = service();
        let legacy = serde_json::json!({
            "id": "t1", "title": "old", "moduleId": "g1", "createdAt": 1, "updatedAt": 1
        });
        tasks.collection().replace_raw(vec![legacy]).await.unwrap();
        assert_eq!(tasks.by_group("g1").await.len(), 1);

        let update = TaskUpdate {
            group_id: Some("g2".to_string()),
            ..TaskUpdate::default()
        };
        let updated = tasks.update("t1", &update).await.unwrap().unwrap();

        assert_eq!(updated.group_id.as_deref(), Some("g2"));
        assert_eq!(tasks.all().await.len(), 1);
        assert_eq!(tasks.by_group("g2").await.len(), 1);
        assert!(tasks.by_group("g1").await.is_empty());
    }

    #[test]
    fn test_empty_update() {
        assert!(TaskUpdate::default().is_empty());
        let update = TaskUpdate {
            status: Some(TaskStatus::Done),
            ..TaskUpdate::default()
        };
        assert!(!update.is_empty());
    }
}

//! The whole board: both collection services, cascade delete across them, and
//! the combined `{ "groups": [...], "tasks": [...] }` import/export document.

use crate::groups::GroupService;
use crate::models::{GROUPS_KEY, TASKS_KEY};
use crate::storage::StorageFactory;
use crate::tasks::TaskService;
use chrono::NaiveDate;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::info;

pub struct Board {
    pub tasks: TaskService,
    pub groups: GroupService,
}

/// Snapshot of every collection, records as stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardExport {
    pub groups: Vec<Value>,
    pub tasks: Vec<Value>,
}

/// Record counts written by an import; `None` for a collection the document left out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub groups: Option<usize>,
    pub tasks: Option<usize>,
}

/// Text format of an import/export file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl Board {
    pub fn open(factory: &StorageFactory) -> Self {
        Self {
            tasks: TaskService::new(factory),
            groups: GroupService::new(factory),
        }
    }

    /// Delete a group after deleting every task that belongs to it
    ///
    /// Returns the number of tasks removed, or `None` if the group doesn't exist.
    pub async fn delete_group_cascade(&self, group_id: &str) -> Result<Option<usize>> {
        if self.groups.get(group_id).await.is_none() {
            return Ok(None);
        }

        let removed = self
            .tasks
            .delete_by_group(group_id)
            .await
            .context("Group not deleted because its tasks could not be removed")?;
        self.groups.delete(group_id).await?;

        info!(group_id, tasks = removed, "Deleted group with its tasks");
        Ok(Some(removed))
    }

    pub async fn export(&self) -> BoardExport {
        BoardExport {
            groups: self.groups.collection().raw().await,
            tasks: self.tasks.collection().raw().await,
        }
    }

    /// Replace collections from a combined document
    ///
    /// Only the top-level shape is checked: an object whose `groups` and `tasks`
    /// fields, when present, are arrays. Records are written as given. Nothing is
    /// written unless the whole shape is valid.
    pub async fn import(&self, document: &Value) -> Result<ImportSummary> {
        let object = document
            .as_object()
            .ok_or_else(|| eyre!("Import document must be a JSON object"))?;

        let groups = Self::array_field(object, GROUPS_KEY)?;
        let tasks = Self::array_field(object, TASKS_KEY)?;

        let mut summary = ImportSummary::default();
        if let Some(groups) = groups {
            self.groups.collection().replace_raw(groups.clone()).await?;
            summary.groups = Some(groups.len());
        }
        if let Some(tasks) = tasks {
            self.tasks.collection().replace_raw(tasks.clone()).await?;
            summary.tasks = Some(tasks.len());
        }

        info!(groups = ?summary.groups, tasks = ?summary.tasks, "Imported board");
        Ok(summary)
    }

    fn array_field<'a>(object: &'a serde_json::Map<String, Value>, key: &str) -> Result<Option<&'a Vec<Value>>> {
        match object.get(key) {
            None => Ok(None),
            Some(Value::Array(records)) => Ok(Some(records)),
            Some(_) => Err(eyre!("Import field {} must be an array", key)),
        }
    }
}

impl DocumentFormat {
    /// YAML for `.yaml`/`.yml`, JSON otherwise
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }

    pub fn render(self, export: &BoardExport) -> Result<String> {
        match self {
            DocumentFormat::Json => serde_json::to_string_pretty(export).context("Failed to render JSON"),
            DocumentFormat::Yaml => serde_yaml::to_string(export).context("Failed to render YAML"),
        }
    }

    pub fn parse(self, text: &str) -> Result<Value> {
        match self {
            DocumentFormat::Json => serde_json::from_str(text).context("Failed to parse JSON import"),
            DocumentFormat::Yaml => serde_yaml::from_str(text).context("Failed to parse YAML import"),
        }
    }
}

/// Default export file name for the given day
pub fn backup_file_name(today: NaiveDate) -> String {
    format!("tasks_backup_{}.json", today.format("%Y-%m-%d"))
}

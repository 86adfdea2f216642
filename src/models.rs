// Data models for the task board

use crate::record::{Record, new_id, now_ms};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collection key for tasks
pub const TASKS_KEY: &str = "tasks";

/// Collection key for groups
pub const GROUPS_KEY: &str = "groups";

/// Colors assigned to new groups, cycled by position
pub const GROUP_COLORS: [&str; 7] = [
    "#4f46e5", "#0891b2", "#059669", "#d97706", "#dc2626", "#7c3aed", "#db2777",
];

/// Field linking a task to its group
pub const GROUP_FIELD: &str = "groupId";

/// Name older records use for `groupId`
pub const LEGACY_GROUP_FIELD: &str = "moduleId";

/// Groups seeded into an empty board
pub const DEFAULT_GROUPS: [&str; 3] = ["Frontend", "Backend", "Testing"];

/// A card on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "moduleId")]
    pub group_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Board column a task sits in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Progress,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A named grouping of tasks with a display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub color: String,
    pub created_at: i64,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id("task"),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: Priority::default(),
            due_date: None,
            tags: Vec::new(),
            group_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check user-editable fields, returning one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Task title cannot be empty".to_string());
        }
        if let Some(due) = self.due_date.as_deref().filter(|d| !d.is_empty()) {
            if NaiveDate::parse_from_str(due, "%Y-%m-%d").is_err() {
                errors.push(format!("Invalid due date: {} (expected YYYY-MM-DD)", due));
            }
        }
        errors
    }

    /// Past its due date and not finished
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        if self.status == TaskStatus::Done {
            return false;
        }
        self.due_date
            .as_deref()
            .and_then(|due| NaiveDate::parse_from_str(due, "%Y-%m-%d").ok())
            .is_some_and(|due| due < today)
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        TASKS_KEY
    }

    /// Fold `moduleId` into `groupId`; an existing `groupId` wins
    fn normalize(record: &mut Value) {
        if let Value::Object(fields) = record {
            if let Some(legacy) = fields.remove(LEGACY_GROUP_FIELD) {
                fields.entry(GROUP_FIELD).or_insert(legacy);
            }
        }
    }
}

impl Group {
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            id: new_id("group"),
            name: name.into(),
            order,
            color: Self::color_for(order),
            created_at: now_ms(),
        }
    }

    pub fn color_for(order: i64) -> String {
        let index = order.rem_euclid(GROUP_COLORS.len() as i64) as usize;
        GROUP_COLORS[index].to_string()
    }

    pub fn validate(&self) -> Vec<String> {
        if self.name.trim().is_empty() {
            vec!["Group name cannot be empty".to_string()]
        } else {
            Vec::new()
        }
    }
}

impl Record for Group {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        GROUPS_KEY
    }
}

/// Split a tag string on ASCII and full-width commas
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split([',', '，'])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::Progress, TaskStatus::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Progress => "progress",
            TaskStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

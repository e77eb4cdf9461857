//! Core fixture types

use serde::{Deserialize, Serialize};

/// A task on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub assignee: Option<String>,
    /// Rendered as `D/D/YYYY`. Older fixtures call this `createdOn`.
    #[serde(default, alias = "createdOn", deserialize_with = "empty_as_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_assigned_to(&self, assignee: &str) -> bool {
        self.assignee.as_deref() == Some(assignee)
    }
}

/// A project and its ordered tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn task(&self, title: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.title == title)
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.task(title).is_some()
    }
}

/// One entry of a tag, assignee, status or priority catalogue.
///
/// `count` and `tasks` are denormalized; see [`crate::Fixture::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub name: String,
    #[serde(default, alias = "taskCount")]
    pub count: usize,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Which catalogue an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogueKind {
    Tag,
    Assignee,
    Status,
    Priority,
}

impl CatalogueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogueKind::Tag => "tag",
            CatalogueKind::Assignee => "assignee",
            CatalogueKind::Status => "status",
            CatalogueKind::Priority => "priority",
        }
    }
}

impl std::fmt::Display for CatalogueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Credential pairs optionally embedded in the fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureCredentials {
    pub valid: Option<Credentials>,
    pub invalid: Option<Credentials>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    #[default]
    Valid,
    Invalid,
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_accepts_created_on_alias() {
        let json = r#"{
            "title": "Fix navigation bug",
            "description": "Menu collapses",
            "status": "To Do",
            "assignee": "John Smith",
            "createdOn": "1/18/2025",
            "tags": ["Bug"]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.due_date.as_deref(), Some("1/18/2025"));
        assert_eq!(task.priority, None);
        assert!(task.has_tag("Bug"));
        assert!(task.is_assigned_to("John Smith"));
    }

    #[test]
    fn test_empty_optional_fields_are_none() {
        let json = r#"{"title": "t", "status": "Done", "priority": "", "assignee": " "}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, None);
        assert_eq!(task.assignee, None);
        assert!(task.tags.is_empty());
    }

    #[test]
    fn test_assignee_task_count_alias() {
        let json = r#"{"name": "Sarah Chen", "taskCount": 2, "tasks": ["a", "b"]}"#;
        let entry: CatalogueEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.count, 2);
    }
}

//! Fixture dataset loading and consistency checks

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::types::{CatalogueEntry, CatalogueKind, FixtureCredentials, Project, Task};

static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("static regex"));

/// The canonical dataset the rendered dashboard is checked against.
///
/// Loaded once per process and never mutated afterwards; share it behind an
/// `Arc` (see [`crate::FixtureOracle`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub credentials: Option<FixtureCredentials>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tags: Vec<CatalogueEntry>,
    #[serde(default)]
    pub assignees: Vec<CatalogueEntry>,
    #[serde(default)]
    pub statuses: Vec<CatalogueEntry>,
    #[serde(default)]
    pub priorities: Vec<CatalogueEntry>,
}

/// A violated fixture precondition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum FixtureIssue {
    CountMismatch {
        catalogue: CatalogueKind,
        name: String,
        count: usize,
        listed: usize,
    },
    UnknownTaskReference {
        catalogue: CatalogueKind,
        name: String,
        title: String,
    },
    DuplicateTitle {
        project: String,
        title: String,
    },
    /// Same title in several projects; the reconciler only sees the first rendered one.
    SharedTitle {
        title: String,
        projects: Vec<String>,
    },
    MalformedDueDate {
        title: String,
        value: String,
    },
    UncataloguedValue {
        catalogue: CatalogueKind,
        title: String,
        value: String,
    },
    /// No status columns; every card reconciles to the unknown status.
    NoStatuses,
}

impl std::fmt::Display for FixtureIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixtureIssue::CountMismatch { catalogue, name, count, listed } => write!(
                f,
                "{} '{}' declares count {} but lists {} task(s)",
                catalogue, name, count, listed
            ),
            FixtureIssue::UnknownTaskReference { catalogue, name, title } => write!(
                f,
                "{} '{}' references unknown task '{}'",
                catalogue, name, title
            ),
            FixtureIssue::DuplicateTitle { project, title } => {
                write!(f, "project '{}' has duplicate task title '{}'", project, title)
            }
            FixtureIssue::SharedTitle { title, projects } => write!(
                f,
                "task title '{}' appears in several projects: {}",
                title,
                projects.join(", ")
            ),
            FixtureIssue::MalformedDueDate { title, value } => {
                write!(f, "task '{}' has malformed due date '{}'", title, value)
            }
            FixtureIssue::UncataloguedValue { catalogue, title, value } => write!(
                f,
                "task '{}' uses {} '{}' which is not in the catalogue",
                title, catalogue, value
            ),
            FixtureIssue::NoStatuses => write!(f, "fixture declares no statuses"),
        }
    }
}

impl Fixture {
    /// Parse a fixture from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a fixture from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading fixture from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn catalogue(&self, kind: CatalogueKind) -> &[CatalogueEntry] {
        match kind {
            CatalogueKind::Tag => &self.tags,
            CatalogueKind::Assignee => &self.assignees,
            CatalogueKind::Status => &self.statuses,
            CatalogueKind::Priority => &self.priorities,
        }
    }

    /// Check the denormalized catalogues and task values against each other.
    ///
    /// Nothing here is enforced at load time; an empty result means the
    /// fixture satisfies every precondition the suite relies on.
    pub fn validate(&self) -> Vec<FixtureIssue> {
        let mut issues = Vec::new();
        if self.statuses.is_empty() {
            issues.push(FixtureIssue::NoStatuses);
        }

        let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
        for project in &self.projects {
            let mut seen: Vec<&str> = Vec::new();
            for task in &project.tasks {
                if seen.contains(&task.title.as_str()) {
                    issues.push(FixtureIssue::DuplicateTitle {
                        project: project.name.clone(),
                        title: task.title.clone(),
                    });
                    continue;
                }
                seen.push(&task.title);
                owners.entry(&task.title).or_default().push(&project.name);
            }
        }

        let mut shared: Vec<_> = owners.into_iter().filter(|(_, p)| p.len() > 1).collect();
        shared.sort_by_key(|(title, _)| *title);
        for (title, projects) in shared {
            issues.push(FixtureIssue::SharedTitle {
                title: title.to_string(),
                projects: projects.into_iter().map(String::from).collect(),
            });
        }

        for kind in [
            CatalogueKind::Tag,
            CatalogueKind::Assignee,
            CatalogueKind::Status,
            CatalogueKind::Priority,
        ] {
            for entry in self.catalogue(kind) {
                if entry.count != entry.tasks.len() {
                    issues.push(FixtureIssue::CountMismatch {
                        catalogue: kind,
                        name: entry.name.clone(),
                        count: entry.count,
                        listed: entry.tasks.len(),
                    });
                }
                for title in &entry.tasks {
                    if self.find_task(title).is_none() {
                        issues.push(FixtureIssue::UnknownTaskReference {
                            catalogue: kind,
                            name: entry.name.clone(),
                            title: title.clone(),
                        });
                    }
                }
            }
        }

        for task in self.projects.iter().flat_map(|p| &p.tasks) {
            if let Some(date) = &task.due_date {
                if !DUE_DATE.is_match(date) {
                    issues.push(FixtureIssue::MalformedDueDate {
                        title: task.title.clone(),
                        value: date.clone(),
                    });
                }
            }
            self.check_catalogued(CatalogueKind::Status, task, Some(&task.status), &mut issues);
            self.check_catalogued(CatalogueKind::Assignee, task, task.assignee.as_ref(), &mut issues);
            // Fixtures without a priority catalogue do not render priorities at all.
            if !self.priorities.is_empty() {
                self.check_catalogued(CatalogueKind::Priority, task, task.priority.as_ref(), &mut issues);
            }
            for tag in &task.tags {
                self.check_catalogued(CatalogueKind::Tag, task, Some(tag), &mut issues);
            }
        }

        issues
    }

    fn check_catalogued(
        &self,
        kind: CatalogueKind,
        task: &Task,
        value: Option<&String>,
        issues: &mut Vec<FixtureIssue>,
    ) {
        let Some(value) = value else { return };
        if !self.catalogue(kind).iter().any(|e| &e.name == value) {
            issues.push(FixtureIssue::UncataloguedValue {
                catalogue: kind,
                title: task.title.clone(),
                value: value.clone(),
            });
        }
    }

    fn find_task(&self, title: &str) -> Option<&Task> {
        self.projects.iter().find_map(|p| p.task(title))
    }
}

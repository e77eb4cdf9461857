//! Read-only queries over the fixture dataset

use std::fmt;
use std::sync::Arc;

use crate::credentials::{self, CredentialPolicy};
use crate::error::Result;
use crate::fixture::Fixture;
use crate::types::{CatalogueEntry, CredentialKind, Credentials, Project, Task};

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Answers structured questions about the fixture.
///
/// Cloning is cheap: the dataset sits behind an `Arc` and is shared by every
/// session of a run.
#[derive(Clone)]
pub struct FixtureOracle {
    fixture: Arc<Fixture>,
    policy: CredentialPolicy,
    /// Replaces the process environment when resolving credentials
    env: Option<EnvLookup>,
}

impl fmt::Debug for FixtureOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureOracle")
            .field("fixture", &self.fixture)
            .field("policy", &self.policy)
            .field("env", &self.env.as_ref().map(|_| "<lookup>"))
            .finish()
    }
}

impl FixtureOracle {
    pub fn new(fixture: Arc<Fixture>) -> Self {
        Self {
            fixture,
            policy: CredentialPolicy::default(),
            env: None,
        }
    }

    pub fn with_policy(mut self, policy: CredentialPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Read `USERNAME` / `PASSWORD` through `lookup` instead of the process
    /// environment
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Some(Arc::new(lookup));
        self
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn policy(&self) -> CredentialPolicy {
        self.policy
    }

    /// Login credentials. See [`CredentialPolicy`] for how `Valid` is sourced.
    pub fn credentials(&self, kind: CredentialKind) -> Result<Credentials> {
        let fixture = self.fixture.credentials.as_ref();
        match &self.env {
            Some(lookup) => credentials::resolve_with(kind, self.policy, fixture, |var| lookup(var)),
            None => credentials::resolve(kind, self.policy, fixture),
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.fixture.projects
    }

    pub fn project_names(&self) -> Vec<&str> {
        self.projects().iter().map(|p| p.name.as_str()).collect()
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects().iter().find(|p| p.name == name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.projects().iter().flat_map(|p| p.tasks.iter())
    }

    pub fn task_titles(&self) -> Vec<&str> {
        self.tasks().map(|t| t.title.as_str()).collect()
    }

    /// First task with this title, scanning projects in order
    pub fn task_by_title(&self, title: &str) -> Option<&Task> {
        self.tasks().find(|t| t.title == title)
    }

    pub fn tasks_by_project(&self, project: &str) -> Vec<&Task> {
        self.project_tasks(project, |_| true)
    }

    pub fn project_task_count(&self, project: &str) -> usize {
        self.project_by_name(project).map_or(0, |p| p.tasks.len())
    }

    pub fn tasks_by_status(&self, status: &str) -> Vec<&Task> {
        self.tasks().filter(|t| t.status == status).collect()
    }

    pub fn tasks_by_tag(&self, tag: &str) -> Vec<&Task> {
        self.tasks().filter(|t| t.has_tag(tag)).collect()
    }

    pub fn tasks_by_assignee(&self, assignee: &str) -> Vec<&Task> {
        self.tasks().filter(|t| t.is_assigned_to(assignee)).collect()
    }

    pub fn project_tasks_by_status(&self, project: &str, status: &str) -> Vec<&Task> {
        self.project_tasks(project, |t| t.status == status)
    }

    pub fn project_tasks_by_tag(&self, project: &str, tag: &str) -> Vec<&Task> {
        self.project_tasks(project, |t| t.has_tag(tag))
    }

    pub fn project_tasks_by_assignee(&self, project: &str, assignee: &str) -> Vec<&Task> {
        self.project_tasks(project, |t| t.is_assigned_to(assignee))
    }

    pub fn tags(&self) -> &[CatalogueEntry] {
        &self.fixture.tags
    }

    pub fn assignees(&self) -> &[CatalogueEntry] {
        &self.fixture.assignees
    }

    pub fn statuses(&self) -> &[CatalogueEntry] {
        &self.fixture.statuses
    }

    pub fn priorities(&self) -> &[CatalogueEntry] {
        &self.fixture.priorities
    }

    pub fn tag_names(&self) -> Vec<&str> {
        names(self.tags())
    }

    pub fn assignee_names(&self) -> Vec<&str> {
        names(self.assignees())
    }

    pub fn status_names(&self) -> Vec<&str> {
        names(self.statuses())
    }

    pub fn priority_names(&self) -> Vec<&str> {
        names(self.priorities())
    }

    fn project_tasks<F>(&self, project: &str, keep: F) -> Vec<&Task>
    where
        F: Fn(&Task) -> bool,
    {
        self.project_by_name(project)
            .map(|p| p.tasks.iter().filter(|t| keep(t)).collect())
            .unwrap_or_default()
    }
}

fn names(entries: &[CatalogueEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

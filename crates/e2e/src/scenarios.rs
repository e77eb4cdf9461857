//! The suite's scenarios
//!
//! Each scenario runs against its own browser session. All of them except
//! the two login checks start from [`sign_in`].

use std::collections::BTreeSet;
use std::fmt::Debug;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use taskboard_common::{CredentialKind, FixtureOracle, Project, Task};

use crate::compare::compare_card;
use crate::config::Selectors;
use crate::driver::PageDriver;
use crate::error::{E2eError, E2eResult};
use crate::pages::{sign_in, DashboardPage, LoginPage};
use crate::reconciler::{CardReconciler, ReconciledCard};

static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("static regex"));

/// What a scenario runs against
#[derive(Clone, Copy)]
pub struct ScenarioContext<'a> {
    pub driver: &'a dyn PageDriver,
    pub oracle: &'a FixtureOracle,
    pub selectors: &'a Selectors,
}

impl<'a> ScenarioContext<'a> {
    fn dashboard(&self) -> DashboardPage<'a> {
        DashboardPage::new(self.driver, self.oracle, self.selectors)
    }

    fn login_page(&self) -> LoginPage<'a> {
        LoginPage::new(self.driver, self.selectors)
    }

    fn reconciler(&self) -> CardReconciler<'a> {
        CardReconciler::new(self.driver, self.oracle)
            .with_project_selector(&self.selectors.project_button)
            .with_heading_selector(&self.selectors.status_heading)
    }

    async fn sign_in(&self) -> E2eResult<()> {
        sign_in(self.driver, self.oracle, self.selectors).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    LoginValid,
    LoginInvalid,
    Logout,
    ProjectNavigation,
    HeaderMatchesProject,
    ProjectTaskCounts,
    StatusDistribution,
    TaskCardDetails,
    TagsByProject,
    AssigneesByProject,
    DataIntegrity,
    ProjectSelectorLabels,
}

impl Scenario {
    pub const ALL: [Scenario; 12] = [
        Scenario::LoginValid,
        Scenario::LoginInvalid,
        Scenario::Logout,
        Scenario::ProjectNavigation,
        Scenario::HeaderMatchesProject,
        Scenario::ProjectTaskCounts,
        Scenario::StatusDistribution,
        Scenario::TaskCardDetails,
        Scenario::TagsByProject,
        Scenario::AssigneesByProject,
        Scenario::DataIntegrity,
        Scenario::ProjectSelectorLabels,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::LoginValid => "login-valid",
            Scenario::LoginInvalid => "login-invalid",
            Scenario::Logout => "logout",
            Scenario::ProjectNavigation => "project-navigation",
            Scenario::HeaderMatchesProject => "header-matches-project",
            Scenario::ProjectTaskCounts => "project-task-counts",
            Scenario::StatusDistribution => "status-distribution",
            Scenario::TaskCardDetails => "task-card-details",
            Scenario::TagsByProject => "tags-by-project",
            Scenario::AssigneesByProject => "assignees-by-project",
            Scenario::DataIntegrity => "data-integrity",
            Scenario::ProjectSelectorLabels => "project-selector-labels",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Scenario::LoginValid => &["auth", "smoke"],
            Scenario::LoginInvalid | Scenario::Logout => &["auth"],
            Scenario::ProjectNavigation => &["dashboard", "smoke"],
            Scenario::HeaderMatchesProject | Scenario::ProjectTaskCounts => &["dashboard"],
            Scenario::StatusDistribution => &["dashboard", "cards"],
            Scenario::TaskCardDetails
            | Scenario::TagsByProject
            | Scenario::AssigneesByProject
            | Scenario::DataIntegrity
            | Scenario::ProjectSelectorLabels => &["cards"],
        }
    }

    pub fn by_name(name: &str) -> Option<Scenario> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn tagged(tag: &str) -> Vec<Scenario> {
        Self::ALL
            .into_iter()
            .filter(|s| s.tags().contains(&tag))
            .collect()
    }

    /// Whether the scenario logs in with valid credentials
    pub fn needs_credentials(&self) -> bool {
        !matches!(self, Scenario::LoginInvalid)
    }

    pub async fn run(self, ctx: &ScenarioContext<'_>) -> E2eResult<()> {
        debug!("Running scenario {}", self.name());
        match self {
            Scenario::LoginValid => login_valid(ctx).await,
            Scenario::LoginInvalid => login_invalid(ctx).await,
            Scenario::Logout => logout(ctx).await,
            Scenario::ProjectNavigation => project_navigation(ctx).await,
            Scenario::HeaderMatchesProject => header_matches_project(ctx).await,
            Scenario::ProjectTaskCounts => project_task_counts(ctx).await,
            Scenario::StatusDistribution => status_distribution(ctx).await,
            Scenario::TaskCardDetails => task_card_details(ctx).await,
            Scenario::TagsByProject => tags_by_project(ctx).await,
            Scenario::AssigneesByProject => assignees_by_project(ctx).await,
            Scenario::DataIntegrity => data_integrity(ctx).await,
            Scenario::ProjectSelectorLabels => project_selector_labels(ctx).await,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message()))
    }
}

fn ensure_eq<T: PartialEq + Debug>(what: &str, expected: T, actual: T) -> E2eResult<()> {
    ensure(expected == actual, || {
        format!("{}: expected {:?}, found {:?}", what, expected, actual)
    })
}

async fn login_valid(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    let login = ctx.login_page();
    login.goto().await?;
    ensure(login.is_form_visible().await?, || "login form is not visible".into())?;
    ctx.sign_in().await
}

async fn login_invalid(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    let login = ctx.login_page();
    login.goto().await?;
    ensure(login.is_form_visible().await?, || "login form is not visible".into())?;

    let credentials = ctx.oracle.credentials(CredentialKind::Invalid)?;
    login.login(&credentials).await?;

    ensure(login.is_error_visible().await?, || {
        "no error shown for invalid credentials".into()
    })?;
    ensure(login.is_form_visible().await?, || {
        "login form disappeared after a rejected login".into()
    })?;
    ensure(!ctx.dashboard().is_loaded().await?, || {
        "dashboard loaded with invalid credentials".into()
    })
}

async fn logout(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    dashboard.logout().await?;
    ensure(dashboard.is_logged_out().await?, || {
        "login form not shown after logout".into()
    })
}

async fn project_navigation(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let actual = ctx.dashboard().project_names_from_ui().await?;
    let expected = ctx.oracle.project_names();

    for name in &expected {
        ensure(actual.iter().any(|a| a == name), || {
            format!("project '{}' missing from navigation {:?}", name, actual)
        })?;
    }
    ensure_eq("number of projects in navigation", expected.len(), actual.len())
}

async fn header_matches_project(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    for name in dashboard.project_names_from_ui().await? {
        dashboard.select_project(&name).await?;
        let header = dashboard.header_title().await?;
        ensure_eq("header after selecting project", Some(name.as_str()), header.as_deref())?;
    }
    Ok(())
}

async fn project_task_counts(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    for project in ctx.oracle.projects() {
        dashboard.select_project(&project.name).await?;
        let visible = dashboard.visible_task_titles().await?;
        ensure_eq(
            &format!("visible tasks in '{}'", project.name),
            project.tasks.len(),
            visible.len(),
        )?;
    }
    Ok(())
}

async fn status_distribution(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    let reconciler = ctx.reconciler();

    for project in ctx.oracle.projects() {
        dashboard.select_project(&project.name).await?;
        let cards = reconciler.cards_for_project(&project.name).await?;

        for status in ctx.oracle.status_names() {
            let expected = ctx.oracle.project_tasks_by_status(&project.name, status).len();
            let actual = cards.iter().filter(|c| c.status == status).count();
            ensure_eq(
                &format!("'{}' tasks in '{}'", project.name, status),
                expected,
                actual,
            )?;

            if let Some(badge) = dashboard.status_badge_count(status).await? {
                ensure_eq(&format!("'{}' column counter", status), expected, badge)?;
            }
        }
    }
    Ok(())
}

async fn task_card_details(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    let reconciler = ctx.reconciler();
    let mut mismatches = Vec::new();

    for project in ctx.oracle.projects() {
        dashboard.select_project(&project.name).await?;
        for task in &project.tasks {
            let card = reconciler.card_details(&task.title).await?.ok_or_else(|| {
                E2eError::AssertionFailed(format!(
                    "card '{}' is not rendered in '{}'",
                    task.title, project.name
                ))
            })?;
            mismatches.extend(compare_card(task, &card));
        }
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(E2eError::CardMismatch(mismatches))
    }
}

async fn tags_by_project(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    check_grouping(
        ctx,
        "tag",
        |project| project.tasks.iter().flat_map(|t| t.tags.iter().cloned()).collect(),
        |oracle, project, tag| titles(oracle.project_tasks_by_tag(project, tag)),
        |card, tag| card.tags.iter().any(|t| t == tag),
    )
    .await
}

async fn assignees_by_project(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    check_grouping(
        ctx,
        "assignee",
        |project| project.tasks.iter().filter_map(|t| t.assignee.clone()).collect(),
        |oracle, project, assignee| titles(oracle.project_tasks_by_assignee(project, assignee)),
        |card, assignee| card.assignee == assignee,
    )
    .await
}

fn titles(tasks: Vec<&Task>) -> BTreeSet<String> {
    tasks.into_iter().map(|t| t.title.clone()).collect()
}

/// Per project, the cards grouped under each key match the fixture's grouping.
async fn check_grouping<K, E, M>(
    ctx: &ScenarioContext<'_>,
    what: &str,
    keys: K,
    expected_titles: E,
    matches: M,
) -> E2eResult<()>
where
    K: Fn(&Project) -> BTreeSet<String> + Send + Sync,
    E: Fn(&FixtureOracle, &str, &str) -> BTreeSet<String> + Send + Sync,
    M: Fn(&ReconciledCard, &str) -> bool + Send + Sync,
{
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    let reconciler = ctx.reconciler();

    for project in ctx.oracle.projects() {
        dashboard.select_project(&project.name).await?;
        let cards = reconciler.cards_for_project(&project.name).await?;

        for key in keys(project) {
            let expected = expected_titles(ctx.oracle, &project.name, &key);
            let actual: BTreeSet<String> = cards
                .iter()
                .filter(|card| matches(card, &key))
                .map(|card| card.title.clone())
                .collect();
            ensure_eq(
                &format!("'{}' cards with {} '{}'", project.name, what, key),
                expected,
                actual,
            )?;
        }
    }
    Ok(())
}

async fn data_integrity(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    let reconciler = ctx.reconciler();
    let statuses = ctx.oracle.status_names();
    let tags = ctx.oracle.tag_names();
    let assignees = ctx.oracle.assignee_names();
    let priorities = ctx.oracle.priority_names();

    for project in ctx.oracle.projects() {
        dashboard.select_project(&project.name).await?;
        let cards = reconciler.all_cards().await?;

        let mut seen = BTreeSet::new();
        for card in &cards {
            ensure(seen.insert(card.title.as_str()), || {
                format!("duplicate card '{}' in '{}'", card.title, project.name)
            })?;
            ensure(statuses.contains(&card.status.as_str()), || {
                format!("card '{}' has status {:?}", card.title, card.status)
            })?;
            for tag in &card.tags {
                ensure(tags.contains(&tag.as_str()), || {
                    format!("card '{}' has unknown tag {:?}", card.title, tag)
                })?;
            }
            ensure(card.assignee.is_empty() || assignees.contains(&card.assignee.as_str()), || {
                format!("card '{}' has unknown assignee {:?}", card.title, card.assignee)
            })?;
            ensure(card.priority.is_empty() || priorities.contains(&card.priority.as_str()), || {
                format!("card '{}' has unknown priority {:?}", card.title, card.priority)
            })?;
            ensure(card.due_date.is_empty() || DUE_DATE.is_match(&card.due_date), || {
                format!("card '{}' has malformed due date {:?}", card.title, card.due_date)
            })?;
        }
    }
    Ok(())
}

async fn project_selector_labels(ctx: &ScenarioContext<'_>) -> E2eResult<()> {
    ctx.sign_in().await?;
    let labels = ctx.reconciler().project_card_titles().await?;
    let expected = ctx.oracle.project_names();

    for name in &expected {
        ensure(labels.iter().any(|l| l == name), || {
            format!("project '{}' missing from selector labels {:?}", name, labels)
        })?;
    }
    ensure(labels.iter().all(|l| !l.is_empty()), || {
        format!("empty project selector label in {:?}", labels)
    })?;
    ensure(labels.len() >= expected.len(), || {
        format!("expected at least {} project labels, found {}", expected.len(), labels.len())
    })
}

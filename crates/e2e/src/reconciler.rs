//! Card reconciliation
//!
//! Recovers structured task attributes from the rendered dashboard by
//! matching container text against the fixture's vocabularies. This is a
//! best-effort text scan, not a parse: a catalogue name that also occurs in
//! surrounding text (another catalogue name, a title, a description) is
//! reported as present. Lookups always scan catalogues in fixture order, so
//! ties resolve by catalogue position rather than position in the text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use taskboard_common::FixtureOracle;

use crate::driver::{ElementRef, PageDriver};
use crate::error::E2eResult;

/// Status reported when no status column contains the card
pub const UNKNOWN_STATUS: &str = "Unknown";

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").expect("static regex"));

static HEADING_BADGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\((\d+)\)\s*$").expect("static regex"));

/// Task attributes as rendered on the dashboard.
///
/// Empty strings stand for "not found on the card".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledCard {
    pub title: String,
    pub status: String,
    pub priority: String,
    pub assignee: String,
    pub due_date: String,
    pub tags: Vec<String>,
}

/// First catalogue name that occurs anywhere in `text`
pub fn first_contained<'n>(text: &str, names: &[&'n str]) -> Option<&'n str> {
    names.iter().copied().find(|name| text.contains(name))
}

pub fn extract_priority(text: &str, priorities: &[&str]) -> String {
    first_contained(text, priorities).unwrap_or_default().to_string()
}

pub fn extract_assignee(text: &str, assignees: &[&str]) -> String {
    first_contained(text, assignees).unwrap_or_default().to_string()
}

pub fn extract_due_date(text: &str) -> String {
    DATE_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Every tag occurring in `text`, in catalogue order
pub fn extract_tags(text: &str, tags: &[&str]) -> Vec<String> {
    tags.iter()
        .filter(|tag| text.contains(*tag))
        .map(|tag| tag.to_string())
        .collect()
}

/// Split a status column heading such as `"To Do (2)"` into its label and
/// the counter rendered next to it
pub fn split_status_heading(text: &str) -> (String, Option<usize>) {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match HEADING_BADGE.captures(&text) {
        Some(caps) => (caps[1].to_string(), caps[2].parse().ok()),
        None => (text, None),
    }
}

/// First element matching `selector` whose heading label is `status`,
/// together with its counter
pub async fn find_status_heading(
    driver: &dyn PageDriver,
    selector: &str,
    status: &str,
) -> E2eResult<Option<(ElementRef, Option<usize>)>> {
    for heading in driver.find_all(selector).await? {
        let (label, badge) = split_status_heading(&driver.text_of(heading).await?);
        if label == status {
            return Ok(Some((heading, badge)));
        }
    }
    Ok(None)
}

/// Map a rendered project label to the first project name it contains
pub fn normalize_project_label(label: &str, project_names: &[&str]) -> String {
    first_contained(label, project_names)
        .map(str::to_string)
        .unwrap_or_else(|| label.to_string())
}

/// Reconciles rendered cards against the fixture vocabularies.
///
/// Holds no state between calls; every query reads the page afresh.
pub struct CardReconciler<'a> {
    driver: &'a dyn PageDriver,
    oracle: &'a FixtureOracle,
    project_selector: &'a str,
    heading_selector: &'a str,
}

impl<'a> CardReconciler<'a> {
    pub fn new(driver: &'a dyn PageDriver, oracle: &'a FixtureOracle) -> Self {
        Self {
            driver,
            oracle,
            project_selector: "button",
            heading_selector: "main h2",
        }
    }

    /// Selector for the project switcher elements read by [`Self::project_card_titles`]
    pub fn with_project_selector(mut self, selector: &'a str) -> Self {
        self.project_selector = selector;
        self
    }

    /// Selector for the status column headings read by [`Self::status_of`]
    pub fn with_heading_selector(mut self, selector: &'a str) -> Self {
        self.heading_selector = selector;
        self
    }

    /// Reconcile the card titled `title`, or `None` when it is not rendered
    pub async fn card_details(&self, title: &str) -> E2eResult<Option<ReconciledCard>> {
        let Some(element) = self.driver.find_first_by_text(title).await? else {
            debug!("No rendered card for '{}'", title);
            return Ok(None);
        };
        let container = self.driver.container_of(element).await?;
        let text = self.driver.text_of(container).await?;

        let card = ReconciledCard {
            title: title.to_string(),
            priority: extract_priority(&text, &self.oracle.priority_names()),
            assignee: extract_assignee(&text, &self.oracle.assignee_names()),
            due_date: extract_due_date(&text),
            tags: extract_tags(&text, &self.oracle.tag_names()),
            status: self.status_of(title).await?,
        };
        debug!(?card, "Reconciled card");
        Ok(Some(card))
    }

    /// Status column whose content includes `title`, scanning statuses in
    /// catalogue order; [`UNKNOWN_STATUS`] when none does.
    pub async fn status_of(&self, title: &str) -> E2eResult<String> {
        for status in self.oracle.status_names() {
            let Some((heading, _)) =
                find_status_heading(self.driver, self.heading_selector, status).await?
            else {
                continue;
            };
            let column = self.driver.container_of(heading).await?;
            if self.driver.text_of(column).await?.contains(title) {
                return Ok(status.to_string());
            }
        }
        Ok(UNKNOWN_STATUS.to_string())
    }

    /// Every rendered fixture task, in fixture order
    pub async fn all_cards(&self) -> E2eResult<Vec<ReconciledCard>> {
        let mut cards = Vec::new();
        for title in self.oracle.task_titles() {
            if let Some(card) = self.card_details(title).await? {
                cards.push(card);
            }
        }
        Ok(cards)
    }

    pub async fn cards_by_status(&self, status: &str) -> E2eResult<Vec<ReconciledCard>> {
        self.filtered(|card| card.status == status).await
    }

    pub async fn cards_by_tag(&self, tag: &str) -> E2eResult<Vec<ReconciledCard>> {
        self.filtered(|card| card.tags.iter().any(|t| t == tag)).await
    }

    pub async fn cards_by_assignee(&self, assignee: &str) -> E2eResult<Vec<ReconciledCard>> {
        self.filtered(|card| card.assignee == assignee).await
    }

    /// Rendered cards whose title belongs to `project` in the fixture
    pub async fn cards_for_project(&self, project: &str) -> E2eResult<Vec<ReconciledCard>> {
        let Some(project) = self.oracle.project_by_name(project) else {
            return Ok(Vec::new());
        };
        let mut cards = Vec::new();
        for task in &project.tasks {
            if let Some(card) = self.card_details(&task.title).await? {
                cards.push(card);
            }
        }
        Ok(cards)
    }

    /// Labels of the project switcher, each normalized to the fixture project
    /// name it contains. Not deduplicated.
    pub async fn project_card_titles(&self) -> E2eResult<Vec<String>> {
        let names = self.oracle.project_names();
        let mut labels = Vec::new();
        for element in self.driver.find_all(self.project_selector).await? {
            let text = self.driver.text_of(element).await?;
            labels.push(normalize_project_label(text.trim(), &names));
        }
        Ok(labels)
    }

    async fn filtered<F>(&self, keep: F) -> E2eResult<Vec<ReconciledCard>>
    where
        F: Fn(&ReconciledCard) -> bool + Send,
    {
        let mut cards = self.all_cards().await?;
        cards.retain(|card| keep(card));
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const PRIORITIES: &[&str] = &["High Priority", "Medium Priority", "Low Priority"];
    const ASSIGNEES: &[&str] = &["Sarah Chen", "John Smith"];
    const TAGS: &[&str] = &["Feature", "Bug", "Design"];

    #[test_case("Implement user authenticationHigh PrioritySarah Chen1/15/2025Feature", "1/15/2025"; "single digit month")]
    #[test_case("Due 12/31/2024 then 1/1/2025", "12/31/2024"; "first date wins")]
    #[test_case("Created 2025-01-15", ""; "iso dates are not recognised")]
    #[test_case("no date here", ""; "absent")]
    fn test_extract_due_date(text: &str, expected: &str) {
        assert_eq!(extract_due_date(text), expected);
    }

    #[test]
    fn test_priority_tie_breaks_by_catalogue_order() {
        let text = "Low Priority (was High Priority)";
        assert_eq!(extract_priority(text, PRIORITIES), "High Priority");
        assert_eq!(extract_priority("Urgent", PRIORITIES), "");
    }

    #[test]
    fn test_assignee_first_match() {
        assert_eq!(extract_assignee("John SmithSarah Chen", ASSIGNEES), "Sarah Chen");
        assert_eq!(extract_assignee("Unassigned", ASSIGNEES), "");
    }

    #[test]
    fn test_tags_collected_in_catalogue_order() {
        assert_eq!(extract_tags("DesignBugFeature", TAGS), vec!["Feature", "Bug", "Design"]);
        assert!(extract_tags("nothing", TAGS).is_empty());
    }

    #[test]
    fn test_substring_false_positive_is_preserved() {
        // "Design" inside the title is indistinguishable from a Design tag.
        let text = "Design system updatesLow PriorityBug";
        assert_eq!(extract_tags(text, TAGS), vec!["Bug", "Design"]);
    }

    #[test_case("To Do", "To Do", None; "no counter")]
    #[test_case("To Do(2)", "To Do", Some(2); "counter glued to the label")]
    #[test_case("  In   Progress (12) ", "In Progress", Some(12); "whitespace collapsed")]
    #[test_case("Review (n)", "Review (n)", None; "non numeric counter kept")]
    fn test_split_status_heading(text: &str, label: &str, badge: Option<usize>) {
        assert_eq!(split_status_heading(text), (label.to_string(), badge));
    }

    #[test]
    fn test_normalize_project_label() {
        let names = ["Web Application", "Mobile Application"];
        assert_eq!(normalize_project_label("Web Application5 tasks", &names), "Web Application");
        assert_eq!(normalize_project_label("Logout", &names), "Logout");
    }
}

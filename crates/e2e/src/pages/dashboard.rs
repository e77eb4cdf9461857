//! Project board

use tracing::debug;

use taskboard_common::FixtureOracle;

use crate::config::Selectors;
use crate::driver::{ElementRef, PageDriver};
use crate::error::{E2eError, E2eResult};
use crate::reconciler::{find_status_heading, normalize_project_label};

pub struct DashboardPage<'a> {
    driver: &'a dyn PageDriver,
    oracle: &'a FixtureOracle,
    selectors: &'a Selectors,
}

impl<'a> DashboardPage<'a> {
    pub fn new(driver: &'a dyn PageDriver, oracle: &'a FixtureOracle, selectors: &'a Selectors) -> Self {
        Self {
            driver,
            oracle,
            selectors,
        }
    }

    /// Every fixture project has a visible switcher button
    pub async fn is_loaded(&self) -> E2eResult<bool> {
        self.driver.wait_until_idle().await?;

        let mut labels = Vec::new();
        for button in self.driver.find_all(&self.selectors.project_button).await? {
            if self.driver.is_visible(button).await? {
                labels.push(self.driver.text_of(button).await?);
            }
        }

        let missing: Vec<&str> = self
            .oracle
            .project_names()
            .into_iter()
            .filter(|name| !labels.iter().any(|label| label.contains(name)))
            .collect();
        if !missing.is_empty() {
            debug!("Dashboard is missing projects: {:?}", missing);
        }
        Ok(missing.is_empty())
    }

    /// Switcher labels normalized to fixture project names, logout excluded
    pub async fn project_names_from_ui(&self) -> E2eResult<Vec<String>> {
        let names = self.oracle.project_names();
        let mut projects = Vec::new();
        for button in self.driver.find_all(&self.selectors.project_button).await? {
            let text = self.driver.text_of(button).await?;
            let text = text.trim();
            if text.is_empty() || text.contains(&self.selectors.logout_text) {
                continue;
            }
            projects.push(normalize_project_label(text, &names));
        }
        Ok(projects)
    }

    pub async fn select_project(&self, name: &str) -> E2eResult<()> {
        let button = self.project_button(name).await?.ok_or_else(|| {
            E2eError::AssertionFailed(format!("no project button for '{}'", name))
        })?;
        self.driver.click(button).await?;
        self.driver.wait_until_idle().await
    }

    pub async fn header_title(&self) -> E2eResult<Option<String>> {
        match self.driver.find_first(&self.selectors.header).await? {
            Some(header) => Ok(Some(self.driver.text_of(header).await?.trim().to_string())),
            None => Ok(None),
        }
    }

    /// Fixture titles currently rendered and visible, in fixture order
    pub async fn visible_task_titles(&self) -> E2eResult<Vec<String>> {
        let mut titles = Vec::new();
        for title in self.oracle.task_titles() {
            if let Some(element) = self.driver.find_first_by_text(title).await? {
                if self.driver.is_visible(element).await? {
                    titles.push(title.to_string());
                }
            }
        }
        Ok(titles)
    }

    /// The `(n)` counter shown next to a status column heading
    pub async fn status_badge_count(&self, status: &str) -> E2eResult<Option<usize>> {
        let heading =
            find_status_heading(self.driver, &self.selectors.status_heading, status).await?;
        Ok(heading.and_then(|(_, badge)| badge))
    }

    pub async fn logout(&self) -> E2eResult<()> {
        let button = self
            .driver
            .find_first_by_text(&self.selectors.logout_text)
            .await?
            .ok_or_else(|| E2eError::AssertionFailed("no logout button".to_string()))?;
        self.driver.click(button).await?;
        self.driver.wait_until_idle().await
    }

    /// The login form's password input is back on screen
    pub async fn is_logged_out(&self) -> E2eResult<bool> {
        match self.driver.find_first(&self.selectors.password_input).await? {
            Some(input) => self.driver.is_visible(input).await,
            None => Ok(false),
        }
    }

    async fn project_button(&self, name: &str) -> E2eResult<Option<ElementRef>> {
        for button in self.driver.find_all(&self.selectors.project_button).await? {
            if self.driver.text_of(button).await?.contains(name) {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }
}

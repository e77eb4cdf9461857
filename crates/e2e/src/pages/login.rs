//! Login screen

use tracing::{debug, info};

use taskboard_common::{CredentialKind, Credentials, FixtureOracle};

use crate::config::Selectors;
use crate::driver::{ElementRef, PageDriver};
use crate::error::{E2eError, E2eResult};
use crate::pages::DashboardPage;

pub struct LoginPage<'a> {
    driver: &'a dyn PageDriver,
    selectors: &'a Selectors,
}

impl<'a> LoginPage<'a> {
    pub fn new(driver: &'a dyn PageDriver, selectors: &'a Selectors) -> Self {
        Self { driver, selectors }
    }

    pub async fn goto(&self) -> E2eResult<()> {
        self.driver.goto("/").await?;
        self.driver.wait_until_idle().await
    }

    pub async fn login(&self, credentials: &Credentials) -> E2eResult<()> {
        debug!("Logging in as '{}'", credentials.username);
        let username = self.require(&self.selectors.username_input).await?;
        self.driver.fill(username, &credentials.username).await?;
        let password = self.require(&self.selectors.password_input).await?;
        self.driver.fill(password, &credentials.password).await?;
        let submit = self.require(&self.selectors.submit_button).await?;
        self.driver.click(submit).await?;
        self.driver.wait_until_idle().await
    }

    /// Username, password and submit are all rendered and visible
    pub async fn is_form_visible(&self) -> E2eResult<bool> {
        for selector in [
            &self.selectors.username_input,
            &self.selectors.password_input,
            &self.selectors.submit_button,
        ] {
            match self.driver.find_first(selector).await? {
                Some(element) if self.driver.is_visible(element).await? => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    pub async fn is_error_visible(&self) -> E2eResult<bool> {
        match self
            .driver
            .find_first_by_text(&self.selectors.login_error_text)
            .await?
        {
            Some(element) => self.driver.is_visible(element).await,
            None => Ok(false),
        }
    }

    async fn require(&self, selector: &str) -> E2eResult<ElementRef> {
        self.driver
            .find_first(selector)
            .await?
            .ok_or_else(|| E2eError::AssertionFailed(format!("login form has no '{}'", selector)))
    }
}

/// Login precondition shared by every scenario that needs the dashboard.
///
/// Fails with a configuration error when valid credentials cannot be
/// resolved, or an assertion failure when the dashboard does not load.
pub async fn sign_in(
    driver: &dyn PageDriver,
    oracle: &FixtureOracle,
    selectors: &Selectors,
) -> E2eResult<()> {
    let login = LoginPage::new(driver, selectors);
    login.goto().await?;

    let credentials = oracle.credentials(CredentialKind::Valid)?;
    login.login(&credentials).await?;

    let dashboard = DashboardPage::new(driver, oracle, selectors);
    if !dashboard.is_loaded().await? {
        let reason = if login.is_error_visible().await? {
            "login was rejected"
        } else {
            "dashboard did not render every project"
        };
        return Err(E2eError::AssertionFailed(format!(
            "sign-in as '{}' failed: {}",
            credentials.username, reason
        )));
    }
    info!("Signed in as '{}'", credentials.username);
    Ok(())
}

//! Suite configuration
//!
//! Every field has a default, so a missing file or a partial file both work.
//! Command-line arguments override whatever is loaded here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use taskboard_common::CredentialPolicy;

use crate::error::E2eResult;
use crate::playwright::{Browser, PlaywrightConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub app: AppConfig,
    pub browser: BrowserConfig,
    pub credentials: CredentialConfig,
    pub selectors: Selectors,
    pub output: OutputConfig,
}

impl SuiteConfig {
    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> E2eResult<Self> {
        if !path.exists() {
            debug!("No suite config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn playwright(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            base_url: self.app.base_url.clone(),
            viewport_width: self.browser.viewport_width,
            viewport_height: self.browser.viewport_height,
            browser: self.browser.kind,
            headless: self.browser.headless,
            node_modules_dir: self.browser.node_modules_dir.clone(),
            launch_timeout: Duration::from_secs(self.browser.launch_timeout_secs),
            command_timeout: Duration::from_secs(self.browser.command_timeout_secs),
            action_timeout: Duration::from_millis(self.browser.action_timeout_ms),
        }
    }
}

/// The dashboard under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub fixture: PathBuf,
    /// Command starting the dashboard; when unset the app must already be running
    pub serve_command: Option<Vec<String>>,
    pub startup_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5173".to_string(),
            fixture: taskboard_common::default_fixture_path(),
            serve_command: None,
            startup_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub node_modules_dir: Option<PathBuf>,
    pub launch_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub action_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        let pw = PlaywrightConfig::default();
        Self {
            kind: pw.browser,
            headless: pw.headless,
            viewport_width: pw.viewport_width,
            viewport_height: pw.viewport_height,
            node_modules_dir: None,
            launch_timeout_secs: pw.launch_timeout.as_secs(),
            command_timeout_secs: pw.command_timeout.as_secs(),
            action_timeout_ms: pw.action_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub policy: CredentialPolicy,
}

/// Where the page objects look for things on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub username_input: String,
    pub password_input: String,
    pub submit_button: String,
    /// Text shown after a rejected login
    pub login_error_text: String,
    pub project_button: String,
    pub header: String,
    /// Status column headings, optionally followed by a `(n)` counter
    pub status_heading: String,
    /// Label of the logout button
    pub logout_text: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            username_input: r#"input[type="text"], input[name*="username"]"#.to_string(),
            password_input: r#"input[type="password"]"#.to_string(),
            submit_button: r#"button[type="submit"]"#.to_string(),
            login_error_text: "Invalid username or password".to_string(),
            project_button: "nav button".to_string(),
            header: "h1".to_string(),
            status_heading: "main h2".to_string(),
            logout_text: "Logout".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    pub screenshot_on_failure: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("test-results"),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            screenshot_on_failure: true,
        }
    }
}

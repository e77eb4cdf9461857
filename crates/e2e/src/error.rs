//! Error types for E2E testing

use thiserror::Error;

use crate::compare::FieldMismatch;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Fixture error: {0}")]
    Fixture(#[from] taskboard_common::Error),

    #[error("App at {0} did not become reachable")]
    AppUnreachable(String),

    #[error("App server failed to start: {0}")]
    ServerStartup(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Bridge protocol error: {0}")]
    Bridge(String),

    #[error("Element handle {0} is stale")]
    StaleElement(u64),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("{} card field(s) differ from the fixture: {}", .0.len(), summarize(.0))]
    CardMismatch(Vec<FieldMismatch>),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn summarize(mismatches: &[FieldMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type E2eResult<T> = Result<T, E2eError>;

//! Error types for the taskboard fixture layer

use thiserror::Error;

/// Result type alias using the fixture Error
pub type Result<T> = std::result::Result<T, Error>;

/// Fixture and configuration errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Required configuration is absent or unusable. Fatal before any scenario runs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),
}

impl Error {
    pub fn missing_env(vars: &[&str]) -> Self {
        Error::Configuration(format!(
            "Missing required environment variables: {} must be set",
            vars.join(" and ")
        ))
    }
}

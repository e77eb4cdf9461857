//! Taskboard Common Library
//!
//! Fixture data model, loading and the read-only oracle the browser suite
//! checks the rendered dashboard against.

pub mod credentials;
pub mod error;
pub mod fixture;
pub mod oracle;
pub mod types;

// Re-export commonly used types
pub use credentials::CredentialPolicy;
pub use error::{Error, Result};
pub use fixture::{Fixture, FixtureIssue};
pub use oracle::FixtureOracle;
pub use types::*;

/// Taskboard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default fixture location, relative to the workspace root
pub fn default_fixture_path() -> std::path::PathBuf {
    std::path::PathBuf::from("fixtures").join("test-data.json")
}

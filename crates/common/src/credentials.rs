//! Login credential resolution

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{CredentialKind, Credentials, FixtureCredentials};

/// Environment variable holding the real login username
pub const USERNAME_VAR: &str = "USERNAME";

/// Environment variable holding the real login password
pub const PASSWORD_VAR: &str = "PASSWORD";

/// Pair returned for [`CredentialKind::Invalid`] when the fixture has none
pub const INVALID_USERNAME: &str = "invalid";
pub const INVALID_PASSWORD: &str = "wrongpassword";

/// How valid credentials are resolved when the environment is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPolicy {
    /// Both `USERNAME` and `PASSWORD` must be set and non-empty, otherwise
    /// resolution fails with [`Error::Configuration`].
    #[default]
    Strict,
    /// Each missing variable is replaced by the fixture's `credentials.valid`
    /// value. Fails only when the fixture carries no valid pair either.
    Fallback,
}

impl std::str::FromStr for CredentialPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CredentialPolicy::Strict),
            "fallback" => Ok(CredentialPolicy::Fallback),
            other => Err(Error::Configuration(format!(
                "unknown credential policy '{}' (expected strict or fallback)",
                other
            ))),
        }
    }
}

/// Resolve credentials of the given kind, reading variables through `lookup`.
///
/// `lookup` stands in for the process environment so callers can inject one.
pub fn resolve_with<F>(
    kind: CredentialKind,
    policy: CredentialPolicy,
    fixture: Option<&FixtureCredentials>,
    lookup: F,
) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    match kind {
        CredentialKind::Invalid => Ok(fixture
            .and_then(|c| c.invalid.clone())
            .unwrap_or_else(|| Credentials::new(INVALID_USERNAME, INVALID_PASSWORD))),
        CredentialKind::Valid => {
            let read = |var: &str| lookup(var).filter(|v| !v.is_empty());
            let username = read(USERNAME_VAR);
            let password = read(PASSWORD_VAR);

            match policy {
                CredentialPolicy::Strict => match (username, password) {
                    (Some(username), Some(password)) => Ok(Credentials { username, password }),
                    _ => Err(Error::missing_env(&[USERNAME_VAR, PASSWORD_VAR])),
                },
                CredentialPolicy::Fallback => {
                    let defaults = fixture.and_then(|c| c.valid.as_ref());
                    let username = username.or_else(|| defaults.map(|d| d.username.clone()));
                    let password = password.or_else(|| defaults.map(|d| d.password.clone()));
                    match (username, password) {
                        (Some(username), Some(password)) => Ok(Credentials { username, password }),
                        _ => Err(Error::Configuration(format!(
                            "{} / {} are unset and the fixture has no valid credentials",
                            USERNAME_VAR, PASSWORD_VAR
                        ))),
                    }
                }
            }
        }
    }
}

/// Resolve credentials from the process environment
pub fn resolve(
    kind: CredentialKind,
    policy: CredentialPolicy,
    fixture: Option<&FixtureCredentials>,
) -> Result<Credentials> {
    resolve_with(kind, policy, fixture, |var| std::env::var(var).ok())
}

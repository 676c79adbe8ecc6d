//! User identity types

use serde::{Deserialize, Serialize};

use crate::auth::groups::ADMIN_GROUP;
use crate::{AuthError, AuthResult};

/// Identity of a logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Numeric account id; 0 for the built-in administrator
    pub id: i64,
    /// Login name
    pub username: String,
    /// Display name
    pub name: String,
    /// Groups the user belongs to
    pub groups: Vec<String>,
}

impl UserProfile {
    pub fn new(
        id: i64,
        username: impl Into<String>,
        name: impl Into<String>,
        groups: Vec<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            name: name.into(),
            groups,
        }
    }

    /// Whether the user belongs to the admin group
    pub fn is_admin(&self) -> bool {
        self.groups.iter().any(|g| g == ADMIN_GROUP)
    }
}

/// Login credentials supplied by the client
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse credentials out of a login request payload
    ///
    /// A missing or empty username is rejected before any backend work
    /// happens.
    pub fn from_args(args: &serde_json::Value) -> AuthResult<Self> {
        let username = args
            .get("username")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if username.is_empty() {
            return Err(AuthError::invalid_credentials("username is required"));
        }

        let password = args
            .get("password")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        Ok(Self::new(username, password))
    }
}

// Keep passwords out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

//! Per-connection session state

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::AuthResult;

/// Session key holding the login name
pub const SESSION_USERNAME: &str = "username";
/// Session key holding the JSON-encoded group list
pub const SESSION_GROUPS: &str = "groups";

/// Cloneable handle to one connection's session data
///
/// The transport layer owns creation and expiry; the gateway only reads and
/// writes the identity keys. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct Session {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }

    pub async fn remove(&self, key: &str) -> Option<String> {
        self.values.write().await.remove(key)
    }

    pub async fn clear(&self) {
        self.values.write().await.clear();
    }

    /// Login name of the session user, if any
    ///
    /// An empty username reads as no user at all.
    pub async fn username(&self) -> Option<String> {
        self.get(SESSION_USERNAME).await.filter(|u| !u.is_empty())
    }

    /// Groups of the session user
    ///
    /// Missing or malformed group data reads as no groups.
    pub async fn groups(&self) -> Vec<String> {
        match self.get(SESSION_GROUPS).await {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Record the identity of a logged-in user
    pub async fn set_identity(&self, username: &str, groups: &[String]) -> AuthResult<()> {
        let encoded = serde_json::to_string(groups)?;
        let mut values = self.values.write().await;
        values.insert(SESSION_USERNAME.to_string(), username.to_string());
        values.insert(SESSION_GROUPS.to_string(), encoded);
        Ok(())
    }

    /// Drop the identity keys, ending the login
    pub async fn clear_identity(&self) {
        let mut values = self.values.write().await;
        values.remove(SESSION_USERNAME);
        values.remove(SESSION_GROUPS);
    }
}

/// One dispatched request and the session it arrived on
#[derive(Debug, Clone)]
pub struct Request {
    pub session: Session,
}

impl Request {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Request on a fresh session with nobody logged in
    pub fn anonymous() -> Self {
        Self::new(Session::new())
    }
}

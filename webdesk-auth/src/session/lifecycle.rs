//! Login, logout, and settings persistence

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use webdesk_core::SystemConfig;

use crate::auth::{Credentials, UserProfile};
use crate::session::store::Request;
use crate::{AuthError, AuthResult};

/// Source of per-user package blacklists
#[async_trait]
pub trait BlacklistSource: Send + Sync {
    async fn blacklist_for(&self, username: &str) -> AuthResult<Vec<String>>;
}

/// Blacklist source that blacklists nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBlacklist;

#[async_trait]
impl BlacklistSource for NoBlacklist {
    async fn blacklist_for(&self, _username: &str) -> AuthResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Blacklist source backed by the system blacklist registry file
#[derive(Debug, Clone)]
pub struct FileBlacklist {
    path: PathBuf,
}

impl FileBlacklist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BlacklistSource for FileBlacklist {
    async fn blacklist_for(&self, username: &str) -> AuthResult<Vec<String>> {
        read_registry_entry(&self.path, username).await
    }
}

/// Resolves a login name to its numeric account id
#[async_trait]
pub trait UserIdResolver: Send + Sync {
    async fn resolve_user_id(&self, username: &str) -> AuthResult<i64>;
}

/// Read one user's entry from a JSON registry file mapping usernames to
/// string lists
pub(crate) async fn read_registry_entry(path: &Path, username: &str) -> AuthResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    let table: HashMap<String, Vec<String>> = serde_json::from_str(&content)?;
    Ok(table.get(username).cloned().unwrap_or_default())
}

/// Data a backend assembles to complete a login
#[derive(Debug, Clone)]
pub struct LoginData {
    pub profile: UserProfile,
    /// Stored settings; `None` means the backend keeps none
    pub settings: Option<Value>,
    /// Precomputed blacklist; `None` asks the lifecycle to fetch it
    pub blacklist: Option<Vec<String>>,
}

impl LoginData {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            settings: None,
            blacklist: None,
        }
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_blacklist(mut self, blacklist: Vec<String>) -> Self {
        self.blacklist = Some(blacklist);
        self
    }
}

/// Payload returned to the client after a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginReply {
    #[serde(rename = "userData")]
    pub user: UserProfile,
    #[serde(rename = "userSettings")]
    pub settings: Value,
    #[serde(rename = "blacklistedPackages")]
    pub blacklisted_packages: Vec<String>,
}

/// Drives login, logout, and settings persistence for a backend
pub struct SessionLifecycle {
    system: SystemConfig,
    blacklist: Arc<dyn BlacklistSource>,
}

impl SessionLifecycle {
    pub fn new(system: SystemConfig, blacklist: Arc<dyn BlacklistSource>) -> Self {
        Self { system, blacklist }
    }

    pub fn system(&self) -> &SystemConfig {
        &self.system
    }

    /// Record a logged-in user on the session and assemble the login reply
    ///
    /// When the backend did not precompute a blacklist it is fetched here;
    /// a failed fetch reads as an empty blacklist rather than a failed
    /// login.
    pub async fn login(&self, req: &Request, data: LoginData) -> AuthResult<LoginReply> {
        let LoginData {
            profile,
            settings,
            blacklist,
        } = data;

        req.session
            .set_identity(&profile.username, &profile.groups)
            .await?;

        let blacklisted_packages = match blacklist {
            Some(list) => list,
            None => match self.blacklist.blacklist_for(&profile.username).await {
                Ok(list) => list,
                Err(err) => {
                    debug!(
                        username = %profile.username,
                        error = %err,
                        "blacklist read failed, defaulting to empty"
                    );
                    Vec::new()
                }
            },
        };

        info!(username = %profile.username, groups = ?profile.groups, "user logged in");

        Ok(LoginReply {
            user: profile,
            settings: settings.unwrap_or_else(|| json!({})),
            blacklisted_packages,
        })
    }

    /// Clear the session identity
    pub async fn logout(&self, req: &Request) -> AuthResult<bool> {
        if let Some(username) = req.session.username().await {
            info!(username, "user logged out");
        }
        req.session.clear_identity().await;
        Ok(true)
    }

    /// Log in a system account
    ///
    /// Settings, groups, blacklist, and the account id are fetched
    /// concurrently. The first three default silently when their backing
    /// file is missing or corrupt; a user whose id cannot be resolved does
    /// not exist, so that failure is surfaced.
    pub async fn system_login(
        &self,
        req: &Request,
        credentials: &Credentials,
        resolver: &dyn UserIdResolver,
    ) -> AuthResult<LoginReply> {
        let username = credentials.username.as_str();
        if username.is_empty() {
            return Err(AuthError::invalid_credentials("username is required"));
        }

        let (settings, groups, blacklist, id) = tokio::join!(
            self.read_user_settings(username),
            read_registry_entry(&self.system.groups_file, username),
            read_registry_entry(&self.system.blacklist_file, username),
            resolver.resolve_user_id(username),
        );

        let groups = groups.unwrap_or_else(|err| {
            debug!(username, error = %err, "groups registry read failed, defaulting to empty");
            Vec::new()
        });
        let blacklist = blacklist.unwrap_or_else(|err| {
            debug!(username, error = %err, "blacklist registry read failed, defaulting to empty");
            Vec::new()
        });
        let id = id?;

        let profile = UserProfile::new(id, username, username, groups);
        self.login(
            req,
            LoginData::new(profile)
                .with_settings(settings)
                .with_blacklist(blacklist),
        )
        .await
    }

    /// Read the user's stored settings; any failure reads as an empty object
    async fn read_user_settings(&self, username: &str) -> Value {
        let path = self.system.settings_path(username);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                debug!(path = %path.display(), error = %err, "settings file is not valid JSON, defaulting");
                json!({})
            }),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "settings file unreadable, defaulting");
                json!({})
            }
        }
    }

    /// Write the session user's settings file
    ///
    /// The parent directory is created on demand and a failure there is
    /// ignored; the write itself decides, and its failure is surfaced.
    pub async fn persist_settings(&self, req: &Request, settings: &Value) -> AuthResult<()> {
        let username = req.session.username().await.ok_or(AuthError::NoSession)?;
        let path = self.system.settings_path(&username);
        let payload = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                debug!(path = %parent.display(), error = %err, "settings directory creation failed");
            }
        }

        tokio::fs::write(&path, payload)
            .await
            .map_err(|err| AuthError::SettingsWrite {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;

        info!(username, path = %path.display(), "settings saved");
        Ok(())
    }
}

//! System backend backed by OS accounts and registry files
//!
//! Logins resolve against the host's account database, group and blacklist
//! memberships come from JSON registry files named in the system
//! configuration, and settings persist to per-user files. The id resolver
//! is a seam: deployments with their own account store swap in an
//! implementation via [`SystemBackend::with_resolver`].

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{Credentials, SessionGate, UserProfile};
use crate::backend::{AuthBackend, BackendContext, DefaultBackend};
use crate::session::{FileBlacklist, LoginReply, Request, UserIdResolver};
use crate::{AuthError, AuthResult};

/// Resolves account ids from a passwd-format file
///
/// Lines follow the `name:password:uid:...` layout; only the name and uid
/// fields are consulted.
#[derive(Debug, Clone)]
pub struct PasswdResolver {
    path: PathBuf,
}

impl PasswdResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for PasswdResolver {
    fn default() -> Self {
        Self::new("/etc/passwd")
    }
}

#[async_trait]
impl UserIdResolver for PasswdResolver {
    async fn resolve_user_id(&self, username: &str) -> AuthResult<i64> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        for line in content.lines() {
            let mut fields = line.split(':');
            if fields.next() != Some(username) {
                continue;
            }
            return fields
                .nth(1)
                .and_then(|uid| uid.parse::<i64>().ok())
                .ok_or_else(|| {
                    AuthError::backend(format!("malformed account entry for {username}"))
                });
        }
        Err(AuthError::invalid_credentials(format!(
            "unknown user: {username}"
        )))
    }
}

/// Backend using system accounts and file-backed registries
pub struct SystemBackend {
    inner: DefaultBackend,
    resolver: Arc<dyn UserIdResolver>,
}

impl SystemBackend {
    pub fn new(context: &BackendContext) -> Self {
        Self::with_resolver(context, Arc::new(PasswdResolver::default()))
    }

    /// Backend with a custom account id resolver
    pub fn with_resolver(context: &BackendContext, resolver: Arc<dyn UserIdResolver>) -> Self {
        let blacklist = FileBlacklist::new(context.config.system.blacklist_file.clone());
        Self {
            inner: DefaultBackend::with_parts(context, SessionGate::new(), Arc::new(blacklist)),
            resolver,
        }
    }
}

#[async_trait]
impl AuthBackend for SystemBackend {
    async fn has_session(&self, req: &Request) -> AuthResult<()> {
        self.inner.has_session(req).await
    }

    async fn check_api_privilege(&self, req: &Request, method: &str) -> AuthResult<()> {
        self.inner.check_api_privilege(req, method).await
    }

    async fn check_vfs_privilege(
        &self,
        req: &Request,
        method: &str,
        args: &Value,
    ) -> AuthResult<()> {
        self.inner.check_vfs_privilege(req, method, args).await
    }

    async fn check_package_privilege(&self, req: &Request, package: &str) -> AuthResult<()> {
        self.inner.check_package_privilege(req, package).await
    }

    async fn user_name(&self, req: &Request) -> Option<String> {
        self.inner.user_name(req).await
    }

    async fn user_groups(&self, req: &Request) -> Vec<String> {
        self.inner.user_groups(req).await
    }

    async fn user_blacklist(&self, req: &Request) -> AuthResult<Vec<String>> {
        self.inner.user_blacklist(req).await
    }

    async fn set_user_data(&self, req: &Request, profile: Option<&UserProfile>) -> AuthResult<()> {
        self.inner.set_user_data(req, profile).await
    }

    async fn save_settings(&self, req: &Request, settings: &Value) -> AuthResult<()> {
        self.inner.lifecycle().persist_settings(req, settings).await
    }

    async fn login(&self, req: &Request, args: Value) -> AuthResult<LoginReply> {
        let credentials = Credentials::from_args(&args)?;
        debug!(username = %credentials.username, "system login requested");
        self.inner
            .lifecycle()
            .system_login(req, &credentials, self.resolver.as_ref())
            .await
    }

    async fn logout(&self, req: &Request) -> AuthResult<bool> {
        self.inner.logout(req).await
    }
}

//! Trusted backend for embedded and single-user deployments
//!
//! Every request is treated as the built-in administrator; login always
//! succeeds and session checks always pass. This is the configuration
//! default, suitable for a desktop running its own server on localhost.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{SessionGate, UserProfile, ADMIN_GROUP};
use crate::backend::{AuthBackend, BackendContext, DefaultBackend};
use crate::session::{LoginData, LoginReply, NoBlacklist, Request};
use crate::AuthResult;

/// Backend that trusts every request
pub struct TrustedBackend {
    inner: DefaultBackend,
}

impl TrustedBackend {
    pub fn new(context: &BackendContext) -> Self {
        Self {
            inner: DefaultBackend::with_parts(
                context,
                SessionGate::trusted(),
                Arc::new(NoBlacklist),
            ),
        }
    }

    /// The administrator identity every login resolves to
    pub fn profile() -> UserProfile {
        UserProfile::new(0, "admin", "Administrator", vec![ADMIN_GROUP.to_string()])
    }
}

#[async_trait]
impl AuthBackend for TrustedBackend {
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
        self.inner.save_settings(req, settings).await
    }

    async fn login(&self, req: &Request, _args: Value) -> AuthResult<LoginReply> {
        debug!("trusted login, using the administrator identity");
        let data = LoginData::new(Self::profile()).with_blacklist(Vec::new());
        self.inner.lifecycle().login(req, data).await
    }

    async fn logout(&self, req: &Request) -> AuthResult<bool> {
        self.inner.logout(req).await
    }
}

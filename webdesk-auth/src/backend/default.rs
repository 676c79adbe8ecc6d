//! Shared backend plumbing
//!
//! [`DefaultBackend`] wires the privilege evaluator and the session
//! lifecycle together and implements every [`AuthBackend`] method except
//! `login`, which concrete backends supply. The built-in backends embed it
//! and delegate.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{PrivilegeEvaluator, SessionGate, UserProfile};
use crate::backend::{AuthBackend, BackendContext};
use crate::session::{BlacklistSource, LoginReply, NoBlacklist, Request, SessionLifecycle};
use crate::{AuthError, AuthResult};

/// Backend base carrying the evaluator and the session lifecycle
pub struct DefaultBackend {
    evaluator: PrivilegeEvaluator,
    lifecycle: SessionLifecycle,
    blacklist: Arc<dyn BlacklistSource>,
}

impl DefaultBackend {
    /// Backend requiring a logged-in session and keeping no blacklist
    pub fn new(context: &BackendContext) -> Self {
        Self::with_parts(context, SessionGate::new(), Arc::new(NoBlacklist))
    }

    /// Backend with an explicit session gate and blacklist source
    pub fn with_parts(
        context: &BackendContext,
        gate: SessionGate,
        blacklist: Arc<dyn BlacklistSource>,
    ) -> Self {
        let evaluator = PrivilegeEvaluator::new(
            gate,
            Arc::clone(&context.config),
            Arc::clone(&context.packages),
            Arc::clone(&context.resolver),
            Arc::clone(&blacklist),
        );
        let lifecycle =
            SessionLifecycle::new(context.config.system.clone(), Arc::clone(&blacklist));
        Self {
            evaluator,
            lifecycle,
            blacklist,
        }
    }

    pub fn evaluator(&self) -> &PrivilegeEvaluator {
        &self.evaluator
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }
}

#[async_trait]
impl AuthBackend for DefaultBackend {
    async fn has_session(&self, req: &Request) -> AuthResult<()> {
        if self.evaluator.gate().has_session(req).await {
            Ok(())
        } else {
            Err(AuthError::NoSession)
        }
    }

    async fn check_api_privilege(&self, req: &Request, method: &str) -> AuthResult<()> {
        self.evaluator.check_api_privilege(req, method).await
    }

    async fn check_vfs_privilege(
        &self,
        req: &Request,
        method: &str,
        args: &Value,
    ) -> AuthResult<()> {
        self.evaluator.check_vfs_privilege(req, method, args).await
    }

    async fn check_package_privilege(&self, req: &Request, package: &str) -> AuthResult<()> {
        self.evaluator.check_package_privilege(req, package).await
    }

    async fn user_name(&self, req: &Request) -> Option<String> {
        req.session.username().await
    }

    async fn user_groups(&self, req: &Request) -> Vec<String> {
        req.session.groups().await
    }

    async fn user_blacklist(&self, req: &Request) -> AuthResult<Vec<String>> {
        match req.session.username().await {
            Some(username) => self.blacklist.blacklist_for(&username).await,
            None => Ok(Vec::new()),
        }
    }

    async fn set_user_data(&self, req: &Request, profile: Option<&UserProfile>) -> AuthResult<()> {
        match profile {
            Some(profile) => {
                req.session
                    .set_identity(&profile.username, &profile.groups)
                    .await
            }
            None => {
                req.session.clear_identity().await;
                Ok(())
            }
        }
    }

    // The base backend keeps no server-side settings store
    async fn save_settings(&self, _req: &Request, _settings: &Value) -> AuthResult<()> {
        Ok(())
    }

    async fn login(&self, _req: &Request, _args: Value) -> AuthResult<LoginReply> {
        Err(AuthError::backend("login is not supported by this backend"))
    }

    async fn logout(&self, req: &Request) -> AuthResult<bool> {
        self.lifecycle.logout(req).await
    }
}

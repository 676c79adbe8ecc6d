//! Privilege checks for API methods, VFS mounts, and packages
//!
//! All three checks follow the same two-stage protocol: first the session
//! gate, then the group requirement of the resource being touched. A
//! request that fails the gate never reaches the group stage.

use std::sync::Arc;
use tracing::{debug, warn};
use webdesk_core::ServerConfig;

use crate::auth::groups::group_satisfies;
use crate::packages::PackageRegistry;
use crate::session::{BlacklistSource, Request};
use crate::vfs::VfsResolver;
use crate::{AuthError, AuthResult};

/// Decides whether a request has a usable session
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionGate {
    trusted: bool,
}

impl SessionGate {
    /// Gate that requires a logged-in user
    pub fn new() -> Self {
        Self { trusted: false }
    }

    /// Gate that trusts every request, for embedded deployments
    pub fn trusted() -> Self {
        Self { trusted: true }
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    /// Whether the request carries a usable session
    pub async fn has_session(&self, req: &Request) -> bool {
        if self.trusted {
            return true;
        }
        req.session.username().await.is_some()
    }
}

/// Applies the session-then-groups protocol for a backend
pub struct PrivilegeEvaluator {
    gate: SessionGate,
    config: Arc<ServerConfig>,
    packages: Arc<PackageRegistry>,
    resolver: Arc<dyn VfsResolver>,
    blacklist: Arc<dyn BlacklistSource>,
}

impl PrivilegeEvaluator {
    pub fn new(
        gate: SessionGate,
        config: Arc<ServerConfig>,
        packages: Arc<PackageRegistry>,
        resolver: Arc<dyn VfsResolver>,
        blacklist: Arc<dyn BlacklistSource>,
    ) -> Self {
        Self {
            gate,
            config,
            packages,
            resolver,
            blacklist,
        }
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    async fn ensure_session(&self, req: &Request) -> AuthResult<()> {
        if self.gate.has_session(req).await {
            Ok(())
        } else {
            Err(AuthError::NoSession)
        }
    }

    /// Check that the session user may call an API method
    ///
    /// Methods without a configured group requirement are open to any
    /// session user.
    pub async fn check_api_privilege(&self, req: &Request, method: &str) -> AuthResult<()> {
        self.ensure_session(req).await?;

        if let Some(requirement) = self.config.api.groups.get(method) {
            let groups = req.session.groups().await;
            if !group_satisfies(&groups, requirement) {
                warn!(method, "API access denied");
                return Err(AuthError::api_denied(method));
            }
        }

        Ok(())
    }

    /// Check that the session user may run a VFS method on the path in `args`
    ///
    /// Requests whose path is absent, does not resolve, or lands on a mount
    /// with no configured requirement pass the check. The mount table is
    /// deployment-defined, and an unresolved path cannot be attributed to a
    /// protected mount.
    pub async fn check_vfs_privilege(
        &self,
        req: &Request,
        method: &str,
        args: &serde_json::Value,
    ) -> AuthResult<()> {
        self.ensure_session(req).await?;

        // copy-style methods carry the source under "src" instead of "path"
        let path = match args
            .get("path")
            .or_else(|| args.get("src"))
            .and_then(|v| v.as_str())
        {
            Some(path) => path,
            None => {
                debug!(method, "VFS request without a path, skipping mount check");
                return Ok(());
            }
        };

        let resolved = match self.resolver.resolve_real_path(path, req).await {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(method, path, error = %err, "VFS path did not resolve, skipping mount check");
                return Ok(());
            }
        };

        if let Some(requirement) = self.config.vfs.groups.get(resolved.mount_name()) {
            let groups = req.session.groups().await;
            if !group_satisfies(&groups, requirement) {
                warn!(method, mount = resolved.mount_name(), "VFS access denied");
                return Err(AuthError::vfs_denied(method));
            }
        } else {
            debug!(mount = resolved.mount_name(), "mount has no group mapping, allowing");
        }

        Ok(())
    }

    /// Check that the session user may load a package
    ///
    /// Packages without a groups declaration are open; the blacklist only
    /// applies to declared packages that passed the group check.
    pub async fn check_package_privilege(&self, req: &Request, package: &str) -> AuthResult<()> {
        self.ensure_session(req).await?;

        let requirement = match self.packages.groups_for(package) {
            Some(requirement) => requirement,
            None => return Ok(()),
        };

        let groups = req.session.groups().await;
        if !group_satisfies(&groups, requirement) {
            warn!(package, "package access denied");
            return Err(AuthError::package_denied(package));
        }

        let username = req.session.username().await.unwrap_or_default();
        let blacklisted = match self.blacklist.blacklist_for(&username).await {
            Ok(list) => list,
            Err(err) => {
                debug!(username, error = %err, "blacklist read failed, treating as empty");
                Vec::new()
            }
        };

        if blacklisted.iter().any(|p| p == package) {
            warn!(package, username, "package is blacklisted for user");
            return Err(AuthError::package_denied(package));
        }

        Ok(())
    }
}

//! Virtual filesystem path resolution
//!
//! VFS requests address files as `mount://path`. The privilege checks only
//! need the mount a path lands on, but resolution is shared with the actual
//! filesystem operations, so the resolver returns the real location too.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::session::Request;
use crate::{AuthError, AuthResult};

/// A virtual path resolved against the mount table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// Mount protocol including the trailing separator, e.g. `home://`
    pub protocol: String,
    /// Path inside the mount
    pub path: String,
    /// Real filesystem location
    pub real_path: PathBuf,
}

impl ResolvedPath {
    /// Mount name without the `://` separator
    pub fn mount_name(&self) -> &str {
        self.protocol.trim_end_matches("://")
    }
}

/// Resolves virtual paths to real filesystem locations
#[async_trait]
pub trait VfsResolver: Send + Sync {
    async fn resolve_real_path(
        &self,
        virtual_path: &str,
        req: &Request,
    ) -> AuthResult<ResolvedPath>;
}

/// Resolver backed by the configured mount table
///
/// Mount targets may contain `%USERNAME%`, substituted with the session
/// user's login name so per-user mounts land in per-user directories.
pub struct MountResolver {
    mounts: HashMap<String, PathBuf>,
}

impl MountResolver {
    pub fn new(mounts: HashMap<String, PathBuf>) -> Self {
        Self { mounts }
    }

    /// Split `mount://path` into its mount name and inner path
    fn split(virtual_path: &str) -> AuthResult<(&str, &str)> {
        virtual_path
            .split_once("://")
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| AuthError::vfs(format!("Invalid virtual path: {}", virtual_path)))
    }
}

#[async_trait]
impl VfsResolver for MountResolver {
    async fn resolve_real_path(
        &self,
        virtual_path: &str,
        req: &Request,
    ) -> AuthResult<ResolvedPath> {
        let (name, inner) = Self::split(virtual_path)?;

        if inner.split('/').any(|part| part == "..") {
            return Err(AuthError::vfs(format!(
                "Path traversal rejected: {}",
                virtual_path
            )));
        }

        let base = self
            .mounts
            .get(name)
            .ok_or_else(|| AuthError::vfs(format!("Unknown mount: {}", name)))?;

        let username = req.session.username().await.unwrap_or_default();
        let base = base.to_string_lossy().replace("%USERNAME%", &username);

        Ok(ResolvedPath {
            protocol: format!("{}://", name),
            path: inner.to_string(),
            real_path: PathBuf::from(base).join(inner.trim_start_matches('/')),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Request;

    fn resolver() -> MountResolver {
        let mut mounts = HashMap::new();
        mounts.insert("home".to_string(), PathBuf::from("/srv/home/%USERNAME%"));
        mounts.insert("shared".to_string(), PathBuf::from("/srv/shared"));
        MountResolver::new(mounts)
    }

    #[test]
    fn resolves_against_mount_table() {
        tokio_test::block_on(async {
            let req = Request::anonymous();
            req.session
                .set_identity("alice", &[])
                .await
                .unwrap();

            let resolved = resolver()
                .resolve_real_path("home://docs/notes.txt", &req)
                .await
                .unwrap();
            assert_eq!(resolved.protocol, "home://");
            assert_eq!(resolved.mount_name(), "home");
            assert_eq!(
                resolved.real_path,
                PathBuf::from("/srv/home/alice/docs/notes.txt")
            );
        });
    }

    #[test]
    fn unknown_mount_is_an_error() {
        tokio_test::block_on(async {
            let err = resolver()
                .resolve_real_path("flash://x", &Request::anonymous())
                .await
                .unwrap_err();
            assert!(matches!(err, crate::AuthError::Vfs { .. }));
        });
    }

    #[test]
    fn rejects_missing_protocol() {
        tokio_test::block_on(async {
            let err = resolver()
                .resolve_real_path("/etc/passwd", &Request::anonymous())
                .await
                .unwrap_err();
            assert!(matches!(err, crate::AuthError::Vfs { .. }));
        });
    }

    #[test]
    fn rejects_path_traversal() {
        tokio_test::block_on(async {
            let err = resolver()
                .resolve_real_path("shared://../../etc/passwd", &Request::anonymous())
                .await
                .unwrap_err();
            assert!(matches!(err, crate::AuthError::Vfs { .. }));
        });
    }
}

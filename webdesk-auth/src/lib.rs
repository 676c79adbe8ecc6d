//! Webdesk Auth - authorization and session gateway
//!
//! This crate decides who may do what on a webdesk server. It sits between
//! the transport layer and the actual API/VFS implementations:
//!
//! - Group evaluation and privilege checks for API methods, VFS mounts,
//!   and package launches
//! - Session identity, login/logout, and settings persistence
//! - A method registry that wraps every installed handler with the
//!   appropriate privilege checks
//! - Pluggable authorization backends selected by configuration
//!
//! ## Architecture
//!
//! The transport layer owns connections and sessions; this crate owns the
//! decisions. A [`HandlerFactory`] builds an [`AuthGateway`] from
//! configuration, and the gateway dispatches privilege-checked method calls.

pub mod auth;
pub mod backend;
pub mod packages;
pub mod registry;
pub mod session;
pub mod vfs;

pub use auth::{
    group_satisfies, group_satisfies_opt, Credentials, PrivilegeEvaluator, SessionGate,
    UserProfile, ADMIN_GROUP,
};
pub use backend::{
    AuthBackend, AuthGateway, BackendContext, BackendRegistry, DefaultBackend, HandlerFactory,
    PasswdResolver, SystemBackend, TrustedBackend,
};
pub use packages::{PackageMetadata, PackageRegistry};
pub use registry::{
    handler, MethodHandler, MethodKind, MethodRegistry, MethodTable, RegistryConfig, FS_PRIVILEGE,
};
pub use session::{
    BlacklistSource, FileBlacklist, LoginData, LoginReply, NoBlacklist, Request, Session,
    SessionLifecycle, UserIdResolver,
};
pub use vfs::{MountResolver, ResolvedPath, VfsResolver};

/// Gateway error type
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no active session")]
    NoSession,

    #[error("You are not allowed to use this API function: {method}")]
    ApiDenied { method: String },

    #[error("You are not allowed to use this VFS function: {method}")]
    VfsDenied { method: String },

    #[error("You are not allowed to load this Package: {package}")]
    PackageDenied { package: String },

    #[error("Invalid login credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("Failed to write settings to {path}: {message}")]
    SettingsWrite { path: String, message: String },

    #[error("Unknown {kind} method: {method}")]
    UnknownMethod { kind: MethodKind, method: String },

    #[error("Unknown authorization backend: {name}")]
    UnknownBackend { name: String },

    #[error("VFS error: {message}")]
    Vfs { message: String },

    #[error("Backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Core error: {0}")]
    Core(#[from] webdesk_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Create an API denial for the given method
    pub fn api_denied<S: Into<String>>(method: S) -> Self {
        Self::ApiDenied {
            method: method.into(),
        }
    }

    /// Create a VFS denial for the given method
    pub fn vfs_denied<S: Into<String>>(method: S) -> Self {
        Self::VfsDenied {
            method: method.into(),
        }
    }

    /// Create a package denial for the given package
    pub fn package_denied<S: Into<String>>(package: S) -> Self {
        Self::PackageDenied {
            package: package.into(),
        }
    }

    /// Create an invalid credentials error
    pub fn invalid_credentials<S: Into<String>>(message: S) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Create a VFS error
    pub fn vfs<S: Into<String>>(message: S) -> Self {
        Self::Vfs {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error with source
    pub fn backend_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Whether this error is an authorization refusal rather than a failure
    ///
    /// Transport layers map refusals to a 403-style response and everything
    /// else to an internal error.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AuthError::NoSession
                | AuthError::ApiDenied { .. }
                | AuthError::VfsDenied { .. }
                | AuthError::PackageDenied { .. }
                | AuthError::InvalidCredentials { .. }
        )
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::{
        AuthBackend, AuthError, AuthGateway, AuthResult, Credentials, HandlerFactory, LoginReply,
        MethodKind, PackageRegistry, Request, Session, UserProfile,
    };
}

//! Method registration and privilege wrapping
//!
//! API and VFS methods are installed through the registry so that every
//! handler runs behind the backend's privilege checks. Exempt methods, the
//! ones that must work before a login exists, are named in the registry
//! configuration.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::backend::AuthBackend;
use crate::session::Request;
use crate::AuthResult;

/// API privilege gating every VFS method before its own check runs
pub const FS_PRIVILEGE: &str = "fs";

/// Which dispatch table a method belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Api,
    Vfs,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Api => write!(f, "API"),
            MethodKind::Vfs => write!(f, "VFS"),
        }
    }
}

/// Boxed async method handler
pub type MethodHandler =
    Arc<dyn Fn(Request, Value) -> BoxFuture<'static, AuthResult<Value>> + Send + Sync>;

/// Build a [`MethodHandler`] from an async closure
pub fn handler<F, Fut>(f: F) -> MethodHandler
where
    F: Fn(Request, Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = AuthResult<Value>> + Send + 'static,
{
    Arc::new(move |req, args| f(req, args).boxed())
}

/// Named methods for one dispatch table
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, MethodHandler>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MethodHandler> {
        self.methods.get(name)
    }

    pub(crate) fn insert(&mut self, name: &str, handler: MethodHandler) {
        self.methods.insert(name.to_string(), handler);
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("methods", &self.names())
            .finish()
    }
}

/// Methods exempt from privilege wrapping
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// API methods registered without the privilege wrapper
    pub ignore_api: HashSet<String>,
    /// VFS methods registered without the privilege wrapper
    pub ignore_vfs: HashSet<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            // login must work before a session user exists
            ignore_api: ["login"].iter().map(|s| s.to_string()).collect(),
            // mime and path lookups carry no user data
            ignore_vfs: ["getMime", "getRealPath"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RegistryConfig {
    /// Configuration with no exemptions
    pub fn strict() -> Self {
        Self {
            ignore_api: HashSet::new(),
            ignore_vfs: HashSet::new(),
        }
    }
}

/// Installs methods into dispatch tables, wrapped with privilege checks
pub struct MethodRegistry {
    backend: Arc<dyn AuthBackend>,
    config: RegistryConfig,
}

impl MethodRegistry {
    pub fn new(backend: Arc<dyn AuthBackend>, config: RegistryConfig) -> Self {
        Self { backend, config }
    }

    /// Register a method; the first registration of a name wins
    pub fn register(
        &self,
        table: &mut MethodTable,
        kind: MethodKind,
        name: &str,
        handler: MethodHandler,
    ) {
        if table.contains(name) {
            debug!(%kind, name, "method already registered, keeping the original");
            return;
        }

        let exempt = match kind {
            MethodKind::Api => self.config.ignore_api.contains(name),
            MethodKind::Vfs => self.config.ignore_vfs.contains(name),
        };

        let handler = if exempt {
            debug!(%kind, name, "registering without privilege wrapper");
            handler
        } else {
            match kind {
                MethodKind::Api => self.wrap_api(name, handler),
                MethodKind::Vfs => self.wrap_vfs(name, handler),
            }
        };

        table.insert(name, handler);
    }

    fn wrap_api(&self, name: &str, inner: MethodHandler) -> MethodHandler {
        let backend = Arc::clone(&self.backend);
        let method = name.to_string();
        Arc::new(move |req: Request, args: Value| {
            let backend = Arc::clone(&backend);
            let method = method.clone();
            let inner = Arc::clone(&inner);
            async move {
                backend.check_api_privilege(&req, &method).await?;
                inner(req, args).await
            }
            .boxed()
        })
    }

    /// VFS methods carry a double gate: the generic `fs` API privilege
    /// first, then the method-and-path specific check
    fn wrap_vfs(&self, name: &str, inner: MethodHandler) -> MethodHandler {
        let backend = Arc::clone(&self.backend);
        let method = name.to_string();
        Arc::new(move |req: Request, args: Value| {
            let backend = Arc::clone(&backend);
            let method = method.clone();
            let inner = Arc::clone(&inner);
            async move {
                backend.check_api_privilege(&req, FS_PRIVILEGE).await?;
                backend.check_vfs_privilege(&req, &method, &args).await?;
                inner(req, args).await
            }
            .boxed()
        })
    }
}

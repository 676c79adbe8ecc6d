//! Pluggable authorization backends
//!
//! A backend owns every decision the gateway makes: session checks,
//! privilege checks, identity storage, and the login/logout/settings
//! operations. Deployments pick one by name through the `handler` field of
//! the server configuration; [`BackendRegistry`] maps names to
//! constructors, and custom backends register alongside the built-in
//! `trusted` and `system` ones.

mod default;
mod system;
mod trusted;

pub use default::DefaultBackend;
pub use system::{PasswdResolver, SystemBackend};
pub use trusted::TrustedBackend;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use webdesk_core::ServerConfig;

use crate::auth::UserProfile;
use crate::packages::PackageRegistry;
use crate::registry::{
    handler, MethodHandler, MethodKind, MethodRegistry, MethodTable, RegistryConfig,
};
use crate::session::{LoginReply, Request};
use crate::vfs::VfsResolver;
use crate::{AuthError, AuthResult};

/// Authorization backend interface
///
/// Privilege checks return `Ok(())` when the call may proceed and a denial
/// error otherwise; any other error means the check itself failed.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Check that the request carries a usable session
    async fn has_session(&self, req: &Request) -> AuthResult<()>;

    /// Check that the session user may call the named API method
    async fn check_api_privilege(&self, req: &Request, method: &str) -> AuthResult<()>;

    /// Check that the session user may run the named VFS method against
    /// the paths found in `args`
    async fn check_vfs_privilege(&self, req: &Request, method: &str, args: &Value)
        -> AuthResult<()>;

    /// Check that the session user may load the named package
    async fn check_package_privilege(&self, req: &Request, package: &str) -> AuthResult<()>;

    /// Username recorded on the session, if any
    async fn user_name(&self, req: &Request) -> Option<String>;

    /// Groups recorded on the session
    async fn user_groups(&self, req: &Request) -> Vec<String>;

    /// Packages blacklisted for the session user
    async fn user_blacklist(&self, req: &Request) -> AuthResult<Vec<String>>;

    /// Record a user on the session, or clear it with `None`
    async fn set_user_data(&self, req: &Request, profile: Option<&UserProfile>) -> AuthResult<()>;

    /// Persist the session user's settings
    async fn save_settings(&self, req: &Request, settings: &Value) -> AuthResult<()>;

    /// Authenticate and establish a session identity
    async fn login(&self, req: &Request, args: Value) -> AuthResult<LoginReply>;

    /// Drop the session identity
    async fn logout(&self, req: &Request) -> AuthResult<bool>;

    /// Called once when the owning server starts
    async fn on_server_start(&self) -> AuthResult<()> {
        Ok(())
    }

    /// Called once when the owning server shuts down
    async fn on_server_end(&self) -> AuthResult<()> {
        Ok(())
    }
}

/// Shared state handed to backend constructors
#[derive(Clone)]
pub struct BackendContext {
    pub config: Arc<ServerConfig>,
    pub packages: Arc<PackageRegistry>,
    pub resolver: Arc<dyn VfsResolver>,
}

impl BackendContext {
    pub fn new(
        config: Arc<ServerConfig>,
        packages: Arc<PackageRegistry>,
        resolver: Arc<dyn VfsResolver>,
    ) -> Self {
        Self {
            config,
            packages,
            resolver,
        }
    }
}

impl std::fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendContext")
            .field("handler", &self.config.handler)
            .field("packages", &self.packages.len())
            .finish()
    }
}

/// Constructor for a named backend
pub type BackendConstructor =
    Box<dyn Fn(&BackendContext) -> AuthResult<Arc<dyn AuthBackend>> + Send + Sync>;

/// Maps backend names to constructors
pub struct BackendRegistry {
    constructors: HashMap<String, BackendConstructor>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("trusted", |ctx: &BackendContext| {
            Ok(Arc::new(TrustedBackend::new(ctx)))
        });
        registry.register("system", |ctx: &BackendContext| {
            Ok(Arc::new(SystemBackend::new(ctx)))
        });
        registry
    }
}

impl BackendRegistry {
    /// Registry without the built-in backends
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a backend constructor under a name, replacing any previous
    /// constructor with that name
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&BackendContext) -> AuthResult<Arc<dyn AuthBackend>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Construct the named backend
    pub fn create(&self, name: &str, context: &BackendContext) -> AuthResult<Arc<dyn AuthBackend>> {
        match self.constructors.get(name) {
            Some(build) => build(context),
            None => Err(AuthError::UnknownBackend {
                name: name.to_string(),
            }),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

/// Builds an [`AuthGateway`] from configuration
///
/// The factory selects the backend named by `config.handler`, installs the
/// built-in `login`/`logout`/`settings` API methods, and then installs any
/// queued application methods behind privilege wrappers.
pub struct HandlerFactory {
    context: BackendContext,
    backends: BackendRegistry,
    registry_config: RegistryConfig,
    api_methods: Vec<(String, MethodHandler)>,
    vfs_methods: Vec<(String, MethodHandler)>,
}

impl HandlerFactory {
    pub fn new(context: BackendContext) -> Self {
        Self {
            context,
            backends: BackendRegistry::default(),
            registry_config: RegistryConfig::default(),
            api_methods: Vec::new(),
            vfs_methods: Vec::new(),
        }
    }

    /// Replace the exemption lists used when wrapping methods
    pub fn with_registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Add or replace a named backend constructor
    pub fn with_backend<F>(mut self, name: &str, constructor: F) -> Self
    where
        F: Fn(&BackendContext) -> AuthResult<Arc<dyn AuthBackend>> + Send + Sync + 'static,
    {
        self.backends.register(name, constructor);
        self
    }

    /// Queue an API method for registration
    pub fn with_api_method(mut self, name: &str, handler: MethodHandler) -> Self {
        self.api_methods.push((name.to_string(), handler));
        self
    }

    /// Queue a VFS method for registration
    pub fn with_vfs_method(mut self, name: &str, handler: MethodHandler) -> Self {
        self.vfs_methods.push((name.to_string(), handler));
        self
    }

    /// Construct the backend and assemble the dispatch tables
    pub async fn build(self) -> AuthResult<AuthGateway> {
        let name = self.context.config.handler.clone();
        let backend = self.backends.create(&name, &self.context)?;
        info!(backend = %name, "authorization backend ready");

        backend.on_server_start().await?;

        let registry = MethodRegistry::new(Arc::clone(&backend), self.registry_config);
        let mut api = MethodTable::new();
        let mut vfs = MethodTable::new();

        // built-ins go first; first-wins registration keeps application
        // methods from shadowing them
        registry.register(
            &mut api,
            MethodKind::Api,
            "login",
            builtin::login(Arc::clone(&backend)),
        );
        registry.register(
            &mut api,
            MethodKind::Api,
            "logout",
            builtin::logout(Arc::clone(&backend)),
        );
        registry.register(
            &mut api,
            MethodKind::Api,
            "settings",
            builtin::settings(Arc::clone(&backend)),
        );

        for (name, handler) in self.api_methods {
            registry.register(&mut api, MethodKind::Api, &name, handler);
        }
        for (name, handler) in self.vfs_methods {
            registry.register(&mut vfs, MethodKind::Vfs, &name, handler);
        }

        debug!(
            api_methods = api.len(),
            vfs_methods = vfs.len(),
            "dispatch tables assembled"
        );

        Ok(AuthGateway { backend, api, vfs })
    }
}

/// Built-in API methods every gateway carries
mod builtin {
    use super::*;

    pub(super) fn login(backend: Arc<dyn AuthBackend>) -> MethodHandler {
        handler(move |req, args| {
            let backend = Arc::clone(&backend);
            async move {
                let reply = backend.login(&req, args).await?;
                Ok(serde_json::to_value(reply)?)
            }
        })
    }

    pub(super) fn logout(backend: Arc<dyn AuthBackend>) -> MethodHandler {
        handler(move |req, _args| {
            let backend = Arc::clone(&backend);
            async move {
                let done = backend.logout(&req).await?;
                Ok(Value::Bool(done))
            }
        })
    }

    pub(super) fn settings(backend: Arc<dyn AuthBackend>) -> MethodHandler {
        handler(move |req, args| {
            let backend = Arc::clone(&backend);
            async move {
                let settings = args.get("settings").cloned().unwrap_or(args);
                backend.save_settings(&req, &settings).await?;
                Ok(Value::Bool(true))
            }
        })
    }
}

/// Privilege-checked method dispatch
pub struct AuthGateway {
    backend: Arc<dyn AuthBackend>,
    api: MethodTable,
    vfs: MethodTable,
}

impl AuthGateway {
    /// Dispatch an API method call
    pub async fn dispatch_api(
        &self,
        req: &Request,
        method: &str,
        args: Value,
    ) -> AuthResult<Value> {
        let handler = self.api.get(method).ok_or_else(|| AuthError::UnknownMethod {
            kind: MethodKind::Api,
            method: method.to_string(),
        })?;
        debug!(method, "dispatching API call");
        handler(req.clone(), args).await
    }

    /// Dispatch a VFS method call
    pub async fn dispatch_vfs(
        &self,
        req: &Request,
        method: &str,
        args: Value,
    ) -> AuthResult<Value> {
        let handler = self.vfs.get(method).ok_or_else(|| AuthError::UnknownMethod {
            kind: MethodKind::Vfs,
            method: method.to_string(),
        })?;
        debug!(method, "dispatching VFS call");
        handler(req.clone(), args).await
    }

    /// Check that the session user may load the named package
    ///
    /// Package loads are not dispatched methods, so the check is exposed
    /// directly for the package loader to call.
    pub async fn check_package_privilege(&self, req: &Request, package: &str) -> AuthResult<()> {
        self.backend.check_package_privilege(req, package).await
    }

    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    pub fn api_methods(&self) -> Vec<&str> {
        self.api.names()
    }

    pub fn vfs_methods(&self) -> Vec<&str> {
        self.vfs.names()
    }

    /// Notify the backend that the server is shutting down
    pub async fn shutdown(&self) -> AuthResult<()> {
        self.backend.on_server_end().await
    }
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("api", &self.api)
            .field("vfs", &self.vfs)
            .finish()
    }
}

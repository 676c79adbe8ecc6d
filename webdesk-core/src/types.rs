//! Core data type definitions

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name of the authorization backend to instantiate ("trusted", "system", ...)
    pub handler: String,
    pub api: ApiConfig,
    pub vfs: VfsConfig,
    pub system: SystemConfig,
    pub logging: LoggingConfig,
}

/// Access rules for API methods
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Method name mapped to the groups required to call it
    pub groups: HashMap<String, GroupRequirement>,
}

/// Access rules and mount table for the virtual filesystem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Mount protocol mapped to the groups required to touch it
    pub groups: HashMap<String, GroupRequirement>,
    /// Mount protocol mapped to its backing directory
    pub mounts: HashMap<String, PathBuf>,
}

/// Locations of the system account registries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// JSON map of username to group list
    pub groups_file: PathBuf,
    /// JSON map of username to blacklisted package names
    pub blacklist_file: PathBuf,
    /// Per-user settings path; `%USERNAME%` is replaced with the login name
    pub settings_template: String,
    /// Settings path used for the root account
    pub root_settings: PathBuf,
}

/// Group requirement attached to an API method, VFS mount, or package
///
/// `false` (or an absent entry) leaves the resource unrestricted, `true`
/// restricts it to administrators, and a string or list names the groups a
/// user must all belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupRequirement {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

impl GroupRequirement {
    /// Group names carried by this requirement, if any
    pub fn names(&self) -> &[String] {
        match self {
            GroupRequirement::Flag(_) => &[],
            GroupRequirement::One(name) => std::slice::from_ref(name),
            GroupRequirement::Many(names) => names,
        }
    }

    /// Whether this requirement admits everyone
    pub fn is_open(&self) -> bool {
        matches!(self, GroupRequirement::Flag(false))
    }
}

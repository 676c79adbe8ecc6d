//! Package manifest registry
//!
//! Installed packages declare, among other things, the groups required to
//! launch them. Only that access-relevant slice is kept here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use webdesk_core::GroupRequirement;

/// Access-relevant slice of a package manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    /// Groups required to launch the package; absent means unrestricted
    #[serde(default)]
    pub groups: Option<GroupRequirement>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: None,
        }
    }

    pub fn with_groups(mut self, groups: GroupRequirement) -> Self {
        self.groups = Some(groups);
        self
    }
}

/// In-memory view of the installed package manifests
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: HashMap<String, PackageMetadata>,
}

#[derive(Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    groups: Option<GroupRequirement>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from a packages manifest, a JSON object mapping
    /// package names to their metadata
    ///
    /// Entries that do not parse are skipped rather than failing the whole
    /// manifest.
    pub fn from_manifest(manifest: &serde_json::Value) -> Self {
        let mut registry = Self::new();

        let Some(entries) = manifest.as_object() else {
            debug!("package manifest is not an object, starting empty");
            return registry;
        };

        for (name, value) in entries {
            match serde_json::from_value::<ManifestEntry>(value.clone()) {
                Ok(entry) => {
                    let mut metadata = PackageMetadata::new(name);
                    metadata.groups = entry.groups;
                    registry.insert(metadata);
                }
                Err(err) => {
                    debug!(package = %name, error = %err, "skipping unparseable manifest entry");
                }
            }
        }

        registry
    }

    pub fn insert(&mut self, metadata: PackageMetadata) {
        self.packages.insert(metadata.name.clone(), metadata);
    }

    pub fn get(&self, name: &str) -> Option<&PackageMetadata> {
        self.packages.get(name)
    }

    /// Group requirement for a package; unknown packages have none
    pub fn groups_for(&self, name: &str) -> Option<&GroupRequirement> {
        self.packages.get(name).and_then(|m| m.groups.as_ref())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.packages.keys().map(|k| k.as_str()).collect()
    }
}

//! Configuration loading and validation

use crate::error::{CoreError, CoreResult};
use crate::logging::LoggingConfig;
use crate::types::{ApiConfig, ServerConfig, SystemConfig, VfsConfig};

use std::path::{Path, PathBuf};

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            handler: "trusted".to_string(),
            api: ApiConfig::default(),
            vfs: VfsConfig::default(),
            system: SystemConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            groups_file: PathBuf::from("/etc/webdesk/groups.json"),
            blacklist_file: PathBuf::from("/etc/webdesk/blacklist.json"),
            settings_template: "/home/%USERNAME%/.webdesk/settings.json".to_string(),
            root_settings: PathBuf::from("/root/.webdesk/settings.json"),
        }
    }
}

impl SystemConfig {
    /// Settings path for the given user, with `%USERNAME%` substituted
    ///
    /// The root account keeps its settings outside `/home`, so it bypasses
    /// the template entirely.
    pub fn settings_path(&self, username: &str) -> PathBuf {
        if username == "root" {
            self.root_settings.clone()
        } else {
            PathBuf::from(self.settings_template.replace("%USERNAME%", username))
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ServerConfig = toml::from_str(&content).map_err(|e| CoreError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CoreError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| CoreError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.handler.is_empty() {
            return Err(CoreError::Config {
                message: "handler must not be empty".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set handler to \"trusted\" or \"system\""),
            });
        }

        if !self.system.settings_template.contains("%USERNAME%") {
            return Err(CoreError::Config {
                message: "system.settings_template must contain %USERNAME%".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion(
                        "Use a template such as /home/%USERNAME%/.webdesk/settings.json",
                    ),
            });
        }

        if self.logging.log_to_file && self.logging.log_file_path.is_none() {
            return Err(CoreError::Config {
                message: "logging.log_file_path must be set when logging to file".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set logging.log_file_path or disable logging.log_to_file"),
            });
        }

        Ok(())
    }
}

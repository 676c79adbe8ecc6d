//! Integration tests for webdesk-core infrastructure

use webdesk_core::{
    config_error, init_logging, storage_error, CoreError, ErrorContext, GroupRequirement,
    LoggingConfig, ServerConfig,
};

#[tokio::test]
async fn test_error_handling() {
    let error = storage_error!("Test storage error", "test_component");

    match &error {
        CoreError::Storage {
            message, context, ..
        } => {
            assert_eq!(message, "Test storage error");
            assert_eq!(context.component, "test_component");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected Storage error"),
    }

    // Logging an error should not panic
    error.log();

    assert!(error.is_recoverable());

    let config_error = CoreError::Config {
        message: "Invalid config".to_string(),
        source: None,
        context: ErrorContext::new("test")
            .with_operation("validate")
            .with_suggestion("Fix the file"),
    };
    assert!(!config_error.is_recoverable());
    let context = config_error.context().expect("Config carries context");
    assert_eq!(context.operation.as_deref(), Some("validate"));
    assert_eq!(context.recovery_suggestions.len(), 1);

    let macro_error = config_error!("Missing handler", "config");
    match macro_error {
        CoreError::Config { context, .. } => {
            assert!(!context.recovery_suggestions.is_empty());
        }
        _ => panic!("Expected Config error"),
    }
}

#[tokio::test]
async fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: webdesk_core::LogFormat::Compact,
        include_location: false,
        include_thread: false,
        log_to_file: false,
        log_file_path: None,
        filter_directives: vec!["webdesk_core=debug".to_string()],
    };

    // The subscriber can only be installed once per process, so only the
    // first test to get here sees Ok; either way it must not panic.
    let _ = init_logging(&config);
}

#[tokio::test]
async fn test_config_validation() {
    let mut config = ServerConfig::default();

    assert!(config.validate().is_ok());

    config.handler = String::new();
    let result = config.validate();
    assert!(result.is_err());

    match result.unwrap_err() {
        CoreError::Config { message, .. } => {
            assert!(message.contains("handler"));
        }
        _ => panic!("Expected Config error"),
    }

    let mut config = ServerConfig::default();
    config.system.settings_template = "/home/shared/settings.json".to_string();
    assert!(config.validate().is_err());

    let mut config = ServerConfig::default();
    config.logging.log_to_file = true;
    config.logging.log_file_path = None;
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn test_config_round_trip() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("webdesk.toml");

    let mut config = ServerConfig::default();
    config.handler = "system".to_string();
    config.api.groups.insert(
        "curl".to_string(),
        GroupRequirement::Many(vec!["admin".to_string(), "net".to_string()]),
    );
    config
        .vfs
        .groups
        .insert("shared".to_string(), GroupRequirement::Flag(true));

    config.save_to_file(&path).expect("save config");
    let loaded = ServerConfig::from_file(&path).expect("load config");

    assert_eq!(loaded.handler, "system");
    assert_eq!(
        loaded.api.groups.get("curl"),
        Some(&GroupRequirement::Many(vec![
            "admin".to_string(),
            "net".to_string()
        ]))
    );
    assert_eq!(
        loaded.vfs.groups.get("shared"),
        Some(&GroupRequirement::Flag(true))
    );
}

#[tokio::test]
async fn test_partial_config_uses_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("webdesk.toml");
    std::fs::write(&path, "handler = \"system\"\n").expect("write config");

    let loaded = ServerConfig::from_file(&path).expect("load config");
    assert_eq!(loaded.handler, "system");
    assert!(loaded.api.groups.is_empty());
    assert!(loaded
        .system
        .settings_template
        .contains("%USERNAME%"));
}

#[tokio::test]
async fn test_group_requirement_parsing() {
    let toml = r#"
        [groups]
        login = false
        curl = "admin"
        fs = ["admin", "fs"]
    "#;

    #[derive(serde::Deserialize)]
    struct Rules {
        groups: std::collections::HashMap<String, GroupRequirement>,
    }

    let rules: Rules = toml::from_str(toml).expect("parse rules");
    assert_eq!(rules.groups.get("login"), Some(&GroupRequirement::Flag(false)));
    assert_eq!(
        rules.groups.get("curl"),
        Some(&GroupRequirement::One("admin".to_string()))
    );
    assert_eq!(
        rules.groups.get("fs"),
        Some(&GroupRequirement::Many(vec![
            "admin".to_string(),
            "fs".to_string()
        ]))
    );

    assert!(GroupRequirement::Flag(false).is_open());
    assert!(!GroupRequirement::Flag(true).is_open());
    assert!(GroupRequirement::One("admin".to_string()).names() == ["admin".to_string()]);
}

#[tokio::test]
async fn test_settings_path_substitution() {
    let config = ServerConfig::default();

    let path = config.system.settings_path("alice");
    assert_eq!(
        path,
        std::path::PathBuf::from("/home/alice/.webdesk/settings.json")
    );

    let root = config.system.settings_path("root");
    assert_eq!(root, config.system.root_settings);
}

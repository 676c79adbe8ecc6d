//! Session lifecycle integration tests

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use webdesk_auth::{
    AuthError, AuthResult, Credentials, FileBlacklist, LoginData, Request, SessionLifecycle,
    UserIdResolver, UserProfile,
};
use webdesk_core::SystemConfig;

fn system_config(dir: &Path) -> SystemConfig {
    SystemConfig {
        groups_file: dir.join("groups.json"),
        blacklist_file: dir.join("blacklist.json"),
        settings_template: dir
            .join("home/%USERNAME%/settings.json")
            .to_string_lossy()
            .into_owned(),
        root_settings: dir.join("root-settings.json"),
    }
}

fn lifecycle_for(dir: &Path) -> SessionLifecycle {
    let config = system_config(dir);
    let blacklist = FileBlacklist::new(config.blacklist_file.clone());
    SessionLifecycle::new(config, Arc::new(blacklist))
}

/// Id resolver with a fixed account table
#[derive(Default)]
struct StaticIds(HashMap<String, i64>);

impl StaticIds {
    fn with(mut self, username: &str, id: i64) -> Self {
        self.0.insert(username.to_string(), id);
        self
    }
}

#[async_trait]
impl UserIdResolver for StaticIds {
    async fn resolve_user_id(&self, username: &str) -> AuthResult<i64> {
        self.0
            .get(username)
            .copied()
            .ok_or_else(|| AuthError::invalid_credentials(format!("unknown user: {username}")))
    }
}

#[tokio::test]
async fn login_records_the_identity_and_assembles_the_reply() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());
    let req = Request::anonymous();

    let profile = UserProfile::new(7, "alice", "Alice", vec!["users".to_string()]);
    let reply = lifecycle
        .login(&req, LoginData::new(profile.clone()))
        .await
        .unwrap();

    assert_eq!(reply.user, profile);
    assert_eq!(reply.settings, json!({}));
    assert!(reply.blacklisted_packages.is_empty());

    assert_eq!(req.session.username().await.as_deref(), Some("alice"));
    assert_eq!(req.session.groups().await, vec!["users".to_string()]);
}

#[tokio::test]
async fn login_fetches_the_blacklist_when_not_precomputed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("blacklist.json"),
        json!({"alice": ["apps/games"]}).to_string(),
    )
    .unwrap();
    let lifecycle = lifecycle_for(dir.path());

    let profile = UserProfile::new(7, "alice", "Alice", vec!["users".to_string()]);

    // no precomputed blacklist: the collaborator is consulted
    let reply = lifecycle
        .login(&Request::anonymous(), LoginData::new(profile.clone()))
        .await
        .unwrap();
    assert_eq!(reply.blacklisted_packages, vec!["apps/games".to_string()]);

    // a precomputed blacklist is taken as-is
    let reply = lifecycle
        .login(
            &Request::anonymous(),
            LoginData::new(profile).with_blacklist(Vec::new()),
        )
        .await
        .unwrap();
    assert!(reply.blacklisted_packages.is_empty());
}

#[tokio::test]
async fn login_then_logout_restores_the_anonymous_state() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());
    let req = Request::anonymous();

    let profile = UserProfile::new(7, "alice", "Alice", vec!["users".to_string()]);
    lifecycle
        .login(&req, LoginData::new(profile))
        .await
        .unwrap();
    assert!(req.session.username().await.is_some());

    assert!(lifecycle.logout(&req).await.unwrap());
    assert!(req.session.username().await.is_none());
    assert!(req.session.groups().await.is_empty());
    assert!(req.session.get("username").await.is_none());
    assert!(req.session.get("groups").await.is_none());
}

#[tokio::test]
async fn the_reply_serializes_with_the_client_field_names() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());

    let profile = UserProfile::new(0, "admin", "Administrator", vec!["admin".to_string()]);
    let reply = lifecycle
        .login(&Request::anonymous(), LoginData::new(profile))
        .await
        .unwrap();

    let encoded = serde_json::to_value(&reply).unwrap();
    assert_eq!(encoded["userData"]["username"], "admin");
    assert_eq!(encoded["userSettings"], json!({}));
    assert_eq!(encoded["blacklistedPackages"], json!([]));
}

#[tokio::test]
async fn system_login_joins_the_four_lookups() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("groups.json"),
        json!({"alice": ["users", "editors"]}).to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("blacklist.json"),
        json!({"alice": ["apps/games"]}).to_string(),
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("home/alice")).unwrap();
    std::fs::write(
        dir.path().join("home/alice/settings.json"),
        json!({"wallpaper": "blue"}).to_string(),
    )
    .unwrap();

    let lifecycle = lifecycle_for(dir.path());
    let resolver = StaticIds::default().with("alice", 1000);
    let req = Request::anonymous();

    let reply = lifecycle
        .system_login(&req, &Credentials::new("alice", "hunter2"), &resolver)
        .await
        .unwrap();

    assert_eq!(reply.user.id, 1000);
    assert_eq!(reply.user.username, "alice");
    assert_eq!(reply.user.name, "alice");
    assert_eq!(
        reply.user.groups,
        vec!["users".to_string(), "editors".to_string()]
    );
    assert_eq!(reply.settings["wallpaper"], "blue");
    assert_eq!(reply.blacklisted_packages, vec!["apps/games".to_string()]);

    assert_eq!(req.session.username().await.as_deref(), Some("alice"));
}

#[tokio::test]
async fn system_login_defaults_when_stores_are_missing() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());
    let resolver = StaticIds::default().with("alice", 1000);

    let reply = lifecycle
        .system_login(
            &Request::anonymous(),
            &Credentials::new("alice", "hunter2"),
            &resolver,
        )
        .await
        .unwrap();

    assert!(reply.user.groups.is_empty());
    assert_eq!(reply.settings, json!({}));
    assert!(reply.blacklisted_packages.is_empty());
}

#[tokio::test]
async fn system_login_defaults_when_stores_are_corrupt() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("groups.json"), "{not json").unwrap();
    std::fs::write(dir.path().join("blacklist.json"), "[]").unwrap();
    std::fs::create_dir_all(dir.path().join("home/alice")).unwrap();
    std::fs::write(dir.path().join("home/alice/settings.json"), "garbage").unwrap();

    let lifecycle = lifecycle_for(dir.path());
    let resolver = StaticIds::default().with("alice", 1000);

    let reply = lifecycle
        .system_login(
            &Request::anonymous(),
            &Credentials::new("alice", "hunter2"),
            &resolver,
        )
        .await
        .unwrap();

    assert!(reply.user.groups.is_empty());
    assert_eq!(reply.settings, json!({}));
    assert!(reply.blacklisted_packages.is_empty());
}

#[tokio::test]
async fn system_login_requires_a_resolvable_account() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());
    let resolver = StaticIds::default().with("alice", 1000);
    let req = Request::anonymous();

    let err = lifecycle
        .system_login(&req, &Credentials::new("mallory", "pw"), &resolver)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { .. }));

    // a failed login leaves the session anonymous
    assert!(req.session.username().await.is_none());
}

#[tokio::test]
async fn system_login_rejects_an_empty_username() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());
    let resolver = StaticIds::default();

    let err = lifecycle
        .system_login(
            &Request::anonymous(),
            &Credentials::new("", "pw"),
            &resolver,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { .. }));
}

#[tokio::test]
async fn root_settings_come_from_the_fixed_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("root-settings.json"),
        json!({"terminal": true}).to_string(),
    )
    .unwrap();

    let lifecycle = lifecycle_for(dir.path());
    let resolver = StaticIds::default().with("root", 0);

    let reply = lifecycle
        .system_login(
            &Request::anonymous(),
            &Credentials::new("root", "pw"),
            &resolver,
        )
        .await
        .unwrap();
    assert_eq!(reply.settings, json!({"terminal": true}));
}

#[tokio::test]
async fn persist_settings_writes_the_users_file() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());

    let req = Request::anonymous();
    req.session
        .set_identity("alice", &["users".to_string()])
        .await
        .unwrap();

    // the settings directory does not exist yet; it is created on demand
    lifecycle
        .persist_settings(&req, &json!({"theme": "dark"}))
        .await
        .unwrap();

    let content = std::fs::read_to_string(dir.path().join("home/alice/settings.json")).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(saved, json!({"theme": "dark"}));
}

#[tokio::test]
async fn persist_settings_requires_a_session() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle_for(dir.path());

    let err = lifecycle
        .persist_settings(&Request::anonymous(), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NoSession));
}

#[tokio::test]
async fn persist_settings_surfaces_write_failures() {
    let dir = TempDir::new().unwrap();
    // a plain file where the settings directory should be makes both the
    // directory creation and the write fail
    std::fs::write(dir.path().join("home"), "blocker").unwrap();

    let lifecycle = lifecycle_for(dir.path());
    let req = Request::anonymous();
    req.session
        .set_identity("alice", &["users".to_string()])
        .await
        .unwrap();

    let err = lifecycle
        .persist_settings(&req, &json!({"theme": "dark"}))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SettingsWrite { .. }));
    assert!(err.to_string().contains("Failed to write settings"));
}

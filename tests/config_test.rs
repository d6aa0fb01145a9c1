mod common;

use std::time::Duration;

use outlook_asana::config::{
    load_env_file_from, parse_folder_path, AuthMode, Config, Credentials, EnvFileStatus, FolderPathSetting,
    Mailbox, Profile, DEFAULT_GRAPH_BASE_URL,
};
use outlook_asana::error::ConfigError;

use common::settings;

#[test]
fn test_app_mode_requires_client_secret() {
    let result = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("auth_mode", "app"),
            ("mail_user", "ops@example.com"),
        ]),
        Profile::Analytics,
    );

    match result {
        Err(ConfigError::Missing { mode, vars }) => {
            assert_eq!(mode, AuthMode::App);
            assert_eq!(vars, vec!["CLIENT_SECRET"]);
        }
        other => panic!("expected missing CLIENT_SECRET, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_delegated_mode_requires_username_and_password() {
    let result = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("client_secret", "s"),
            ("auth_mode", "delegated"),
        ]),
        Profile::Analytics,
    );

    match result {
        Err(ConfigError::Missing { mode, vars }) => {
            assert_eq!(mode, AuthMode::Delegated);
            assert_eq!(vars, vec!["MAIL_USER", "MAIL_PASSWORD"]);
        }
        other => panic!("expected missing credentials, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_migration_profile_requires_asana_settings() {
    let result = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("client_secret", "s"),
            ("mail_user", "ops@example.com"),
        ]),
        Profile::Migration,
    );

    let err = result.expect_err("asana settings are mandatory for the migration");
    let text = err.to_string();
    assert!(text.contains("ASANA_PAT"), "{}", text);
    assert!(text.contains("ASANA_WORKSPACE_GID"), "{}", text);
    assert!(text.contains("ASANA_PROJECT_GID"), "{}", text);
}

#[test]
fn test_invalid_auth_mode() {
    let result = Config::from_settings(
        settings(&[("tenant_id", "t"), ("client_id", "c"), ("auth_mode", "kerberos")]),
        Profile::Analytics,
    );
    assert!(matches!(result, Err(ConfigError::Invalid { name: "AUTH_MODE", .. })));
}

#[test]
fn test_app_mode_defaults() {
    let config = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("client_secret", "s"),
            ("mail_user", "ops@example.com"),
        ]),
        Profile::Analytics,
    )
    .expect("valid configuration");

    assert!(matches!(config.graph.credentials, Credentials::App(_)));
    assert_eq!(config.graph.mailbox, Mailbox::User("ops@example.com".to_string()));
    assert_eq!(config.graph.base_url, DEFAULT_GRAPH_BASE_URL);
    assert_eq!(
        config.graph.token_url(),
        "https://login.microsoftonline.com/t/oauth2/v2.0/token"
    );
    assert_eq!(config.mail.folder_path, vec!["Inbox"]);
    assert_eq!(config.mail.max_messages, None);
    assert!(config.asana.is_none());
    assert_eq!(config.migration.delay, Duration::from_millis(500));
    assert_eq!(config.analytics.topic_count, 5);
    assert_eq!(config.analytics.output_path.to_str(), Some("email_summary.csv"));
}

#[test]
fn test_legacy_analytics_names() {
    let config = Config::from_settings(
        settings(&[
            ("az_tenant_id", "t"),
            ("az_client_id", "c"),
            ("auth_mode", "delegated"),
            ("az_username", "bob@example.com"),
            ("az_password", "pw"),
            ("az_base_url", "https://graph.example/v1.0"),
        ]),
        Profile::Analytics,
    )
    .expect("legacy names are accepted");

    assert_eq!(config.graph.tenant_id, "t");
    assert_eq!(config.graph.mailbox, Mailbox::Me);
    assert_eq!(config.graph.base_url, "https://graph.example/v1.0");
    match &config.graph.credentials {
        Credentials::Delegated(user) => assert_eq!(user.username, "bob@example.com"),
        Credentials::App(_) => panic!("expected delegated credentials"),
    }
}

#[test]
fn test_mail_settings_parsing() {
    let config = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("client_secret", "s"),
            ("mail_user", "ops@example.com"),
            ("mail_folder_path", r#"["Inbox", "Harbor", "4410"]"#),
            ("mail_max_messages", "25"),
            ("mail_received_since", "2024-02-01"),
            ("migrate_attachments", "true"),
        ]),
        Profile::Analytics,
    )
    .expect("valid configuration");

    assert_eq!(config.mail.folder_path, vec!["Inbox", "Harbor", "4410"]);
    assert_eq!(config.mail.max_messages, Some(25));
    assert_eq!(
        config.mail.received_since.map(|d| d.to_rfc3339()),
        Some("2024-02-01T00:00:00+00:00".to_string())
    );
    assert!(config.migration.migrate_attachments);

    // list literal with single quotes, as written in older .env files
    let quoted = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("client_secret", "s"),
            ("mail_user", "ops@example.com"),
            ("mail_folder_path", "['Inbox', 'Harbor', \"4410\"]"),
        ]),
        Profile::Analytics,
    )
    .expect("quoted list accepted");
    assert_eq!(quoted.mail.folder_path, vec!["Inbox", "Harbor", "4410"]);

    let bad = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("client_secret", "s"),
            ("mail_user", "ops@example.com"),
            ("mail_max_messages", "lots"),
        ]),
        Profile::Analytics,
    );
    assert!(matches!(bad, Err(ConfigError::Invalid { name: "MAIL_MAX_MESSAGES", .. })));
}

#[test]
fn test_credentials_debug_hides_secrets() {
    let config = Config::from_settings(
        settings(&[
            ("tenant_id", "t"),
            ("client_id", "c"),
            ("auth_mode", "delegated"),
            ("mail_user", "bob@example.com"),
            ("mail_password", "super-secret"),
        ]),
        Profile::Analytics,
    )
    .expect("valid configuration");

    let debug = format!("{:?}", config.graph);
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("bob@example.com"));
}

#[test]
fn test_folder_path_formats() {
    let parse = |text: &str| parse_folder_path(FolderPathSetting::Text(text.to_string())).expect("valid path");

    assert_eq!(parse("Inbox/Harbor"), vec!["Inbox", "Harbor"]);
    assert_eq!(parse(r#"["Inbox", "Harbor"]"#), vec!["Inbox", "Harbor"]);
    assert_eq!(parse("['Inbox', 'Harbor']"), vec!["Inbox", "Harbor"]);
    assert_eq!(parse("[]"), vec!["Inbox"]);
    assert_eq!(parse(""), vec!["Inbox"]);
    assert!(parse_folder_path(FolderPathSetting::Text("['Inbox'".to_string())).is_err());
}

#[test]
fn test_env_file_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.env");
    std::fs::write(&path, "OUTLOOK_ASANA_ENV_FILE_CHECK=loaded\n").expect("write env file");

    assert_eq!(load_env_file_from(&path), EnvFileStatus::Loaded(path.clone()));
    assert_eq!(
        std::env::var("OUTLOOK_ASANA_ENV_FILE_CHECK").as_deref(),
        Ok("loaded")
    );

    let missing = dir.path().join("missing.env");
    assert!(matches!(
        load_env_file_from(&missing),
        EnvFileStatus::NotLoaded { path, .. } if path == missing
    ));
}

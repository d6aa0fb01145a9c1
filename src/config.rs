use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_ASANA_BASE_URL: &str = "https://app.asana.com/api/1.0";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_FOLDER: &str = "Inbox";
pub const SUMMARY_FILE_NAME: &str = "email_summary.csv";

const DEFAULT_MIGRATION_DELAY_MS: u64 = 500;
const DEFAULT_TOPIC_COUNT: usize = 5;
const DEFAULT_TOP_N: usize = 5;

/// Quel point d'entrée charge la configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Migration,
    Analytics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Client credentials (secret applicatif)
    App,
    /// Resource owner password (utilisateur + mot de passe)
    Delegated,
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "app" => Ok(AuthMode::App),
            "delegated" => Ok(AuthMode::Delegated),
            other => Err(ConfigError::Invalid {
                name: "AUTH_MODE",
                reason: format!("'{}' (expected 'app' or 'delegated')", other),
            }),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::App => write!(f, "app"),
            AuthMode::Delegated => write!(f, "delegated"),
        }
    }
}

#[derive(Clone)]
pub struct AppCredentials {
    pub client_secret: String,
}

#[derive(Clone)]
pub struct DelegatedCredentials {
    pub username: String,
    pub password: String,
}

/// Credentials for exactly one token flow, chosen once at startup
#[derive(Clone)]
pub enum Credentials {
    App(AppCredentials),
    Delegated(DelegatedCredentials),
}

impl Credentials {
    pub fn mode(&self) -> AuthMode {
        match self {
            Credentials::App(_) => AuthMode::App,
            Credentials::Delegated(_) => AuthMode::Delegated,
        }
    }
}

// Ne jamais afficher les secrets dans les logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::App(_) => f.write_str("App { client_secret: *** }"),
            Credentials::Delegated(c) => write!(f, "Delegated {{ username: {}, password: *** }}", c.username),
        }
    }
}

/// Boîte mail ciblée par les appels Graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mailbox {
    /// `/me`, utilisateur du token délégué
    Me,
    /// `/users/{id}`, obligatoire avec le flow applicatif
    User(String),
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub credentials: Credentials,
    pub mailbox: Mailbox,
    pub authority_host: String,
    pub base_url: String,
}

impl GraphConfig {
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub folder_path: Vec<String>,
    pub max_messages: Option<usize>,
    pub received_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct AsanaConfig {
    pub pat: String,
    pub base_url: String,
    pub workspace_gid: String,
    pub project_gid: String,
    pub section_gid: Option<String>,
    pub location_field_gid: Option<String>,
    pub job_number_field_gid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub migrate_attachments: bool,
    pub delay: Duration,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        MigrationOptions {
            migrate_attachments: false,
            delay: Duration::from_millis(DEFAULT_MIGRATION_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticsOptions {
    pub topic_count: usize,
    pub top_n: usize,
    pub output_path: PathBuf,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        AnalyticsOptions {
            topic_count: DEFAULT_TOPIC_COUNT,
            top_n: DEFAULT_TOP_N,
            output_path: PathBuf::from(SUMMARY_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub graph: GraphConfig,
    pub mail: MailConfig,
    /// Toujours présent pour le profil migration
    pub asana: Option<AsanaConfig>,
    pub migration: MigrationOptions,
    pub analytics: AnalyticsOptions,
}

/// MAIL_FOLDER_PATH accepte "Inbox/Sub" ou un tableau
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FolderPathSetting {
    Text(String),
    List(Vec<String>),
}

/// Valeurs brutes, telles que lues depuis le fichier et l'environnement
#[derive(Debug, Default, Deserialize)]
pub struct RawSettings {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub auth_mode: Option<String>,
    pub mail_user: Option<String>,
    pub mail_password: Option<String>,
    pub mail_folder_path: Option<FolderPathSetting>,
    pub mail_max_messages: Option<String>,
    pub mail_received_since: Option<String>,
    pub asana_pat: Option<String>,
    pub asana_workspace_gid: Option<String>,
    pub asana_project_gid: Option<String>,
    pub asana_section_gid: Option<String>,
    pub location_field_gid: Option<String>,
    pub job_number_field_gid: Option<String>,
    pub migrate_attachments: Option<String>,
    pub migration_delay_ms: Option<String>,
    pub analytics_topics: Option<String>,
    pub analysis_top_n: Option<String>,
    pub graph_base_url: Option<String>,
    pub authority_host: Option<String>,
    pub asana_base_url: Option<String>,
    // Anciens noms utilisés par le script d'analytics
    pub az_tenant_id: Option<String>,
    pub az_client_id: Option<String>,
    pub az_client_secret: Option<String>,
    pub az_username: Option<String>,
    pub az_password: Option<String>,
    pub az_base_url: Option<String>,
}

/// Charger le fichier .env (ENV_FILE permet de changer le chemin).
///
/// Appelé avant l'initialisation du logger : le résultat est renvoyé pour
/// être journalisé ensuite avec [`log_env_file`].
pub fn load_env_file() -> EnvFileStatus {
    let path = std::env::var("ENV_FILE").unwrap_or_else(|_| DEFAULT_ENV_FILE.to_string());
    load_env_file_from(Path::new(&path))
}

/// Résultat du chargement du fichier .env
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFileStatus {
    Loaded(PathBuf),
    NotLoaded { path: PathBuf, reason: String },
}

pub fn load_env_file_from(path: &Path) -> EnvFileStatus {
    match dotenv::from_path(path) {
        Ok(()) => EnvFileStatus::Loaded(path.to_path_buf()),
        Err(e) => EnvFileStatus::NotLoaded {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    }
}

pub fn log_env_file(status: &EnvFileStatus) {
    match status {
        EnvFileStatus::Loaded(path) => info!("📄 Environment loaded from {}", path.display()),
        EnvFileStatus::NotLoaded { path, reason } => {
            debug!("No env file loaded from {}: {}", path.display(), reason)
        }
    }
}

impl Config {
    /// Configuration chargée depuis CONFIG_FILE (optionnel) puis les variables d'environnement
    pub fn load(profile: Profile) -> Result<Self, ConfigError> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        if Path::new(&config_file).exists() {
            info!("📄 Reading configuration file {}", config_file);
        } else {
            debug!("Configuration file {} not found, using environment only", config_file);
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(Path::new(&config_file)).required(false))
            .add_source(config::Environment::default())
            .build()?;

        Self::from_settings(settings, profile)
    }

    pub fn from_settings(settings: config::Config, profile: Profile) -> Result<Self, ConfigError> {
        let raw: RawSettings = settings.try_deserialize()?;
        Self::from_raw(raw, profile)
    }

    pub fn from_raw(raw: RawSettings, profile: Profile) -> Result<Self, ConfigError> {
        let mode = match non_empty(raw.auth_mode) {
            Some(value) => value.parse()?,
            None => AuthMode::App,
        };

        let mut missing_vars = Vec::new();

        let tenant_id = require(
            non_empty(raw.tenant_id).or(non_empty(raw.az_tenant_id)),
            "TENANT_ID",
            &mut missing_vars,
        );
        let client_id = require(
            non_empty(raw.client_id).or(non_empty(raw.az_client_id)),
            "CLIENT_ID",
            &mut missing_vars,
        );

        let username = non_empty(raw.mail_user).or(non_empty(raw.az_username));
        let password = non_empty(raw.mail_password).or(non_empty(raw.az_password));

        // Vérifier les champs propres au mode choisi
        let (credentials, mailbox) = match mode {
            AuthMode::App => {
                let secret = require(
                    non_empty(raw.client_secret).or(non_empty(raw.az_client_secret)),
                    "CLIENT_SECRET",
                    &mut missing_vars,
                );
                let user = require(username, "MAIL_USER", &mut missing_vars);
                (
                    Credentials::App(AppCredentials { client_secret: secret }),
                    Mailbox::User(user),
                )
            }
            AuthMode::Delegated => {
                let username = require(username, "MAIL_USER", &mut missing_vars);
                let password = require(password, "MAIL_PASSWORD", &mut missing_vars);
                (
                    Credentials::Delegated(DelegatedCredentials { username, password }),
                    Mailbox::Me,
                )
            }
        };

        let asana = match profile {
            Profile::Migration => {
                let pat = require(non_empty(raw.asana_pat), "ASANA_PAT", &mut missing_vars);
                let workspace_gid = require(
                    non_empty(raw.asana_workspace_gid),
                    "ASANA_WORKSPACE_GID",
                    &mut missing_vars,
                );
                let project_gid = require(
                    non_empty(raw.asana_project_gid),
                    "ASANA_PROJECT_GID",
                    &mut missing_vars,
                );
                Some(AsanaConfig {
                    pat,
                    base_url: non_empty(raw.asana_base_url)
                        .unwrap_or_else(|| DEFAULT_ASANA_BASE_URL.to_string()),
                    workspace_gid,
                    project_gid,
                    section_gid: non_empty(raw.asana_section_gid),
                    location_field_gid: non_empty(raw.location_field_gid),
                    job_number_field_gid: non_empty(raw.job_number_field_gid),
                })
            }
            Profile::Analytics => None,
        };

        if !missing_vars.is_empty() {
            return Err(ConfigError::Missing { mode, vars: missing_vars });
        }

        let folder_path = match raw.mail_folder_path {
            Some(setting) => parse_folder_path(setting)?,
            None => vec![DEFAULT_FOLDER.to_string()],
        };

        let mail = MailConfig {
            folder_path,
            max_messages: parse_number(raw.mail_max_messages, "MAIL_MAX_MESSAGES")?,
            received_since: non_empty(raw.mail_received_since)
                .map(|value| parse_since(&value))
                .transpose()?,
        };

        let migration = MigrationOptions {
            migrate_attachments: parse_flag(raw.migrate_attachments, "MIGRATE_ATTACHMENTS")?
                .unwrap_or(false),
            delay: Duration::from_millis(
                parse_number(raw.migration_delay_ms, "MIGRATION_DELAY_MS")?
                    .unwrap_or(DEFAULT_MIGRATION_DELAY_MS),
            ),
        };

        let analytics = AnalyticsOptions {
            topic_count: parse_number(raw.analytics_topics, "ANALYTICS_TOPICS")?
                .unwrap_or(DEFAULT_TOPIC_COUNT),
            top_n: parse_number(raw.analysis_top_n, "ANALYSIS_TOP_N")?.unwrap_or(DEFAULT_TOP_N),
            output_path: PathBuf::from(SUMMARY_FILE_NAME),
        };

        if asana.as_ref().is_some_and(|a| a.section_gid.is_none()) {
            warn!("ASANA_SECTION_GID not set - tasks will stay in the project's default section");
        }

        Ok(Config {
            graph: GraphConfig {
                tenant_id,
                client_id,
                credentials,
                mailbox,
                authority_host: non_empty(raw.authority_host)
                    .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
                base_url: non_empty(raw.graph_base_url)
                    .or(non_empty(raw.az_base_url))
                    .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            },
            mail,
            asana,
            migration,
            analytics,
        })
    }

    /// Affichage pour --check-config (sans les secrets)
    pub fn print_summary(&self) {
        println!("✅ Configuration valide !");
        println!("🔑 Auth mode: {}", self.graph.credentials.mode());
        println!("🏢 Tenant: {}", self.graph.tenant_id);
        match &self.graph.mailbox {
            Mailbox::Me => println!("📧 Mailbox: /me"),
            Mailbox::User(user) => println!("📧 Mailbox: /users/{}", user),
        }
        println!("📁 Folder: {}", self.mail.folder_path.join("/"));
        if let Some(max) = self.mail.max_messages {
            println!("🔢 Max messages: {}", max);
        }
        if let Some(since) = self.mail.received_since {
            println!("📅 Received since: {}", since.to_rfc3339());
        }
        if let Some(asana) = &self.asana {
            println!("📋 Asana workspace: {}", asana.workspace_gid);
            println!("📋 Asana project: {}", asana.project_gid);
            println!(
                "📋 Asana section: {}",
                asana.section_gid.as_deref().unwrap_or("(default)")
            );
            println!("📎 Attachments: {}", self.migration.migrate_attachments);
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value {
        Some(v) => v,
        None => {
            missing.push(name);
            String::new()
        }
    }
}

fn parse_number<T: FromStr>(value: Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    non_empty(value)
        .map(|v| {
            v.parse::<T>().map_err(|_| ConfigError::Invalid {
                name,
                reason: format!("'{}' is not a valid number", v),
            })
        })
        .transpose()
}

fn parse_flag(value: Option<String>, name: &'static str) -> Result<Option<bool>, ConfigError> {
    non_empty(value)
        .map(|v| match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                reason: format!("'{}' is not a boolean", v),
            }),
        })
        .transpose()
}

/// "Inbox/Clients/1234", '["Inbox", "Clients", "1234"]' ou "['Inbox', 'Clients']"
pub fn parse_folder_path(setting: FolderPathSetting) -> Result<Vec<String>, ConfigError> {
    let segments = match setting {
        FolderPathSetting::List(list) => list,
        FolderPathSetting::Text(text) => {
            let text = text.trim();
            if text.starts_with('[') {
                match serde_json::from_str::<Vec<String>>(text) {
                    Ok(list) => list,
                    Err(_) => parse_quoted_list(text)?,
                }
            } else {
                text.split('/').map(str::to_string).collect()
            }
        }
    };

    let segments: Vec<String> = segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        Ok(vec![DEFAULT_FOLDER.to_string()])
    } else {
        Ok(segments)
    }
}

// Liste avec quotes simples, format des anciens fichiers .env
fn parse_quoted_list(text: &str) -> Result<Vec<String>, ConfigError> {
    let inner = text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ConfigError::Invalid {
            name: "MAIL_FOLDER_PATH",
            reason: format!("'{}' is not a list", text),
        })?;

    Ok(inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .collect())
}

fn parse_since(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ConfigError::Invalid {
            name: "MAIL_RECEIVED_SINCE",
            reason: format!("'{}' (expected RFC 3339 or YYYY-MM-DD)", value),
        })
}

use thiserror::Error;

use crate::config::AuthMode;

/// Configuration problems, detected before any network call
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration for auth mode '{mode}': {}", .vars.join(", "))]
    Missing {
        mode: AuthMode,
        vars: Vec<&'static str>,
    },

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Unable to load configuration: {0}")]
    Source(#[from] config::ConfigError),
}

/// Token acquisition against the Microsoft identity platform
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Token request rejected (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("Malformed token response: {0}")]
    Malformed(String),
}

/// Microsoft Graph mail listing errors
#[derive(Error, Debug)]
pub enum MailError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Graph request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Graph API error (HTTP {status}) on {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Mail folder '{segment}' not found (path: {path})")]
    FolderNotFound { segment: String, path: String },

    #[error("Unable to decode Graph response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Asana task creation errors
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Asana request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 400/404: unknown gid or malformed custom field value
    #[error("Invalid Asana request (HTTP {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("Asana authorization failed (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Asana rate limit reached (retry after {retry_after:?}s): {message}")]
    RateLimited {
        retry_after: Option<u64>,
        message: String,
    },

    #[error("Asana API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unable to decode Asana response: {0}")]
    Decode(String),
}

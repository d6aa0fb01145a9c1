use std::fmt;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::{AuthMode, Credentials, GraphConfig};
use crate::error::AuthError;

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are treated as expired this many seconds early
const EXPIRY_SKEW_SECONDS: i64 = 60;
const DEFAULT_EXPIRES_IN: i64 = 3600;
/// Upper bound on the lifetime trusted from `expires_in`
const MAX_EXPIRES_IN: i64 = 24 * 3600;

#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: String, expires_in_seconds: i64) -> Self {
        let lifetime = expires_in_seconds
            .clamp(0, MAX_EXPIRES_IN)
            .saturating_sub(EXPIRY_SKEW_SECONDS)
            .max(0);
        AccessToken {
            secret,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Acquires Graph bearer tokens for whichever flow the credentials select.
///
/// The token is kept in memory until it is about to expire; there is no
/// refresh-token handling.
pub struct GraphAuthenticator {
    http: Client,
    token_url: String,
    client_id: String,
    credentials: Credentials,
    cached: Mutex<Option<AccessToken>>,
}

impl GraphAuthenticator {
    pub fn new(http: Client, config: &GraphConfig) -> Self {
        GraphAuthenticator {
            http,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            credentials: config.credentials.clone(),
            cached: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    pub async fn access_token(&self) -> Result<AccessToken, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("client_id", self.client_id.clone()),
            ("scope", GRAPH_SCOPE.to_string()),
        ];

        match &self.credentials {
            Credentials::App(app) => {
                params.push(("grant_type", "client_credentials".to_string()));
                params.push(("client_secret", app.client_secret.clone()));
            }
            Credentials::Delegated(user) => {
                params.push(("grant_type", "password".to_string()));
                params.push(("username", user.username.clone()));
                params.push(("password", user.password.clone()));
            }
        }

        params
    }

    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        debug!("Requesting {} token from {}", self.mode(), self.token_url);

        let response = self
            .http
            .post(&self.token_url)
            .form(&self.form_params())
            .send()
            .await
            .map_err(|source| AuthError::Transport {
                url: self.token_url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| AuthError::Transport {
            url: self.token_url.clone(),
            source,
        })?;

        if !status.is_success() {
            let details: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            let description = details
                .error_description
                .or(details.error)
                .unwrap_or_else(|| body.trim().chars().take(200).collect());
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                description,
            });
        }

        let payload: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))?;

        if payload.access_token.trim().is_empty() {
            return Err(AuthError::Malformed("empty access_token".to_string()));
        }

        let token = AccessToken::new(
            payload.access_token,
            payload.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        );
        info!("🔐 Acquired Graph access token ({} flow)", self.mode());
        Ok(token)
    }
}

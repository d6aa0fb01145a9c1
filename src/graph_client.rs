use base64::Engine;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::GraphAuthenticator;
use crate::config::{GraphConfig, MailConfig, Mailbox};
use crate::email::text::html_to_text;
use crate::email::{AttachmentInfo, AttachmentKind, MailMessage};
use crate::error::MailError;

pub const MESSAGE_PAGE_SIZE: usize = 50;
const FOLDER_PAGE_SIZE: usize = 100;
const MESSAGE_SELECT_FIELDS: &str =
    "id,subject,from,sender,receivedDateTime,body,bodyPreview,parentFolderId,hasAttachments";

/// What to list: folder, bounds and whether to expand attachments
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub folder_path: Vec<String>,
    pub max_messages: Option<usize>,
    pub received_since: Option<DateTime<Utc>>,
    pub include_attachments: bool,
}

impl MessageQuery {
    pub fn from_config(config: &MailConfig) -> Self {
        MessageQuery {
            folder_path: config.folder_path.clone(),
            max_messages: config.max_messages,
            received_since: config.received_since,
            include_attachments: false,
        }
    }

    pub fn with_attachments(mut self, include: bool) -> Self {
        self.include_attachments = include;
        self
    }

    pub fn folder_label(&self) -> String {
        self.folder_path.join("/")
    }
}

#[derive(Debug, Deserialize)]
struct GraphPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphMailFolder {
    id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct GraphMessage {
    id: String,
    subject: Option<String>,
    from: Option<GraphRecipient>,
    sender: Option<GraphRecipient>,
    #[serde(rename = "receivedDateTime")]
    received_date_time: Option<String>,
    body: Option<GraphBody>,
    #[serde(rename = "bodyPreview")]
    body_preview: Option<String>,
    #[serde(default)]
    attachments: Vec<GraphAttachment>,
}

#[derive(Debug, Deserialize)]
struct GraphRecipient {
    #[serde(rename = "emailAddress")]
    email_address: Option<GraphEmailAddress>,
}

impl GraphRecipient {
    fn address(&self) -> Option<String> {
        self.email_address
            .as_ref()
            .and_then(|email| email.address.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphBody {
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphAttachment {
    id: String,
    name: Option<String>,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(rename = "@odata.type")]
    odata_type: Option<String>,
    #[serde(rename = "contentBytes")]
    content_bytes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphErrorBody {
    error: Option<GraphErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Thin wrapper over the Graph mail folder and message endpoints
pub struct GraphClient {
    http: Client,
    base_url: String,
    mailbox: Mailbox,
    auth: GraphAuthenticator,
}

impl GraphClient {
    /// Build the client and acquire a first token so auth problems surface early
    pub async fn connect(config: &GraphConfig) -> Result<Self, MailError> {
        info!("Connecting to Microsoft Graph ({})", config.base_url);

        let http = Client::builder()
            .user_agent(concat!("outlook-asana/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| MailError::Transport {
                url: config.base_url.clone(),
                source,
            })?;

        let client = GraphClient {
            auth: GraphAuthenticator::new(http.clone(), config),
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mailbox: config.mailbox.clone(),
        };

        client.auth.access_token().await?;
        info!("✅ Microsoft Graph connection established");

        Ok(client)
    }

    fn mailbox_root(&self) -> String {
        match &self.mailbox {
            Mailbox::Me => format!("{}/me", self.base_url),
            Mailbox::User(user) => format!("{}/users/{}", self.base_url, user),
        }
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response, MailError> {
        let token = self.auth.access_token().await?;
        debug!("Graph GET {} {:?}", url, query);

        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .header("accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|source| MailError::Transport {
                url: url.to_string(),
                source,
            })?;

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MailError> {
        let response = self.get(url, query).await?;
        let status = response.status();
        let body = response.text().await.map_err(|source| MailError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(api_error(status, url, &body));
        }

        serde_json::from_str(&body).map_err(|e| MailError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn list_folders(&self, url: &str) -> Result<Vec<GraphMailFolder>, MailError> {
        let mut folders = Vec::new();
        let mut next = Some(url.to_string());
        let mut query = vec![("$top", FOLDER_PAGE_SIZE.to_string())];

        while let Some(page_url) = next {
            let page: GraphPage<GraphMailFolder> = self.get_json(&page_url, &query).await?;
            folders.extend(page.value);
            next = page.next_link;
            // nextLink already carries the query string
            query.clear();
        }

        Ok(folders)
    }

    /// Walk the folder hierarchy by display name and return the folder id
    pub async fn resolve_folder(&self, path: &[String]) -> Result<String, MailError> {
        let root = self.mailbox_root();
        let mut folder_id: Option<String> = None;

        for segment in path {
            let url = match &folder_id {
                Some(parent) => format!("{}/mailFolders/{}/childFolders", root, parent),
                None => format!("{}/mailFolders", root),
            };

            let folders = self.list_folders(&url).await?;
            let found = folders
                .into_iter()
                .find(|f| f.display_name.trim().eq_ignore_ascii_case(segment.trim()))
                .ok_or_else(|| MailError::FolderNotFound {
                    segment: segment.clone(),
                    path: path.join("/"),
                })?;

            folder_id = Some(found.id);
        }

        let folder_id = folder_id.ok_or_else(|| MailError::FolderNotFound {
            segment: String::new(),
            path: String::new(),
        })?;

        info!("📁 Folder '{}' resolved to id {}", path.join("/"), folder_id);
        Ok(folder_id)
    }

    /// List every message of the folder, following `@odata.nextLink`
    pub async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<MailMessage>, MailError> {
        let folder_id = self.resolve_folder(&query.folder_path).await?;
        let url = format!("{}/mailFolders/{}/messages", self.mailbox_root(), folder_id);

        let mut params = vec![
            ("$top", MESSAGE_PAGE_SIZE.to_string()),
            ("$select", MESSAGE_SELECT_FIELDS.to_string()),
            ("$orderby", "receivedDateTime asc".to_string()),
        ];
        if let Some(since) = query.received_since {
            params.push((
                "$filter",
                format!("receivedDateTime ge {}", since.format("%Y-%m-%dT%H:%M:%SZ")),
            ));
        }
        if query.include_attachments {
            params.push(("$expand", "attachments".to_string()));
        }

        let mut messages = Vec::new();
        let mut next = Some(url);
        let mut page_count = 0;

        'pages: while let Some(page_url) = next {
            let page: GraphPage<GraphMessage> = self.get_json(&page_url, &params).await?;
            page_count += 1;
            debug!("Graph page {} returned {} message(s)", page_count, page.value.len());

            for raw in page.value {
                if query.max_messages.is_some_and(|max| messages.len() >= max) {
                    break 'pages;
                }
                messages.push(normalize_message(raw, &query.folder_path));
            }

            if query.max_messages.is_some_and(|max| messages.len() >= max) {
                break;
            }

            next = page.next_link;
            params.clear();
        }

        info!(
            "📬 Fetched {} message(s) from '{}' ({} page(s))",
            messages.len(),
            query.folder_label(),
            page_count
        );
        Ok(messages)
    }

    /// Attachment content, or None when Graph refuses it as too large (413)
    pub async fn download_attachment(
        &self,
        message: &MailMessage,
        attachment: &AttachmentInfo,
    ) -> Result<Option<Vec<u8>>, MailError> {
        if let Some(content) = &attachment.inline_content {
            return Ok(Some(content.clone()));
        }

        let url = format!(
            "{}/messages/{}/attachments/{}/$value",
            self.mailbox_root(),
            message.id,
            attachment.id
        );

        let response = self.get(&url, &[]).await?;
        let status = response.status();

        if status == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("Attachment too large for Graph download: {}", attachment.name);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &url, &body));
        }

        let bytes = response.bytes().await.map_err(|source| MailError::Transport {
            url: url.clone(),
            source,
        })?;

        debug!("Downloaded attachment {} ({} bytes)", attachment.name, bytes.len());
        Ok(Some(bytes.to_vec()))
    }
}

fn api_error(status: StatusCode, url: &str, body: &str) -> MailError {
    let details: GraphErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match details.error {
        Some(GraphErrorDetail { code, message }) => format!(
            "{}: {}",
            code.unwrap_or_else(|| "unknown".to_string()),
            message.unwrap_or_default()
        ),
        None => body.trim().chars().take(200).collect(),
    };

    MailError::Api {
        status: status.as_u16(),
        url: url.to_string(),
        message,
    }
}

fn normalize_message(raw: GraphMessage, folder_path: &[String]) -> MailMessage {
    let sender = raw
        .from
        .as_ref()
        .and_then(GraphRecipient::address)
        .or_else(|| raw.sender.as_ref().and_then(GraphRecipient::address))
        .unwrap_or_else(|| "unknown".to_string());

    let subject = raw
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "(No Subject)".to_string());

    let received = match raw.received_date_time.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(dt)) => dt.with_timezone(&Utc),
        _ => {
            warn!("Message {} has no valid receivedDateTime, using current date", raw.id);
            Utc::now()
        }
    };

    let body = match raw.body {
        Some(GraphBody {
            content: Some(content),
            content_type,
        }) if !content.trim().is_empty() => {
            if content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("html")) {
                html_to_text(&content)
            } else {
                content.trim().to_string()
            }
        }
        _ => {
            debug!("Using bodyPreview for message {}", raw.id);
            raw.body_preview.unwrap_or_default()
        }
    };

    let attachments = raw
        .attachments
        .into_iter()
        .map(|att| normalize_attachment(att, &raw.id))
        .collect();

    MailMessage {
        id: raw.id,
        sender,
        subject,
        received,
        body,
        folder_path: folder_path.to_vec(),
        attachments,
    }
}

fn normalize_attachment(raw: GraphAttachment, message_id: &str) -> AttachmentInfo {
    let kind = match raw.odata_type.as_deref() {
        Some(t) if t.ends_with("itemAttachment") || t.ends_with("ItemAttachment") => AttachmentKind::Item,
        Some(t) if t.ends_with("referenceAttachment") || t.ends_with("ReferenceAttachment") => {
            AttachmentKind::Reference
        }
        _ => AttachmentKind::File,
    };

    let inline_content = raw.content_bytes.as_deref().and_then(|encoded| {
        match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Invalid contentBytes for attachment {} of message {}: {}", raw.id, message_id, e);
                None
            }
        }
    });

    AttachmentInfo {
        id: raw.id,
        name: raw.name.unwrap_or_else(|| "attachment".to_string()),
        content_type: raw.content_type,
        size: raw.size,
        kind,
        inline_content,
    }
}

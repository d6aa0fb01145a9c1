use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::config::AsanaConfig;
use crate::error::TaskError;
use crate::task::TaskRequest;

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsanaUser {
    pub gid: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTask {
    pub gid: String,
    #[serde(default)]
    pub name: String,
    pub permalink_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AsanaErrorBody {
    #[serde(default)]
    errors: Vec<AsanaErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct AsanaErrorEntry {
    message: Option<String>,
}

/// Asana REST client authenticated with a personal access token
pub struct AsanaClient {
    http: Client,
    base_url: String,
    pat: String,
}

impl AsanaClient {
    pub fn new(config: &AsanaConfig) -> Result<Self, TaskError> {
        info!("Initializing Asana client ({})", config.base_url);

        let http = Client::builder()
            .user_agent(concat!("outlook-asana/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(AsanaClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            pat: config.pat.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, TaskError> {
        let response = request
            .bearer_auth(&self.pat)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_error(status, &body, retry_after))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TaskError> {
        let body = self.send(request).await?;
        let envelope: DataEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| TaskError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    /// User owning the PAT, used to check the token at startup
    pub async fn current_user(&self) -> Result<AsanaUser, TaskError> {
        self.send_json(self.http.get(self.url("/users/me"))).await
    }

    /// Create the task in its project, then move it to the target section.
    /// The task exists once `POST /tasks` succeeds, so a failed move only warns.
    pub async fn create_task(&self, request: &TaskRequest) -> Result<CreatedTask, TaskError> {
        let mut data = json!({
            "name": request.title,
            "notes": request.notes,
            "workspace": request.targets.workspace_gid,
            "projects": [request.targets.project_gid],
        });
        if !request.custom_fields.is_empty() {
            data["custom_fields"] = json!(request.custom_fields);
        }

        debug!("Creating Asana task '{}'", request.title);
        let task: CreatedTask = self
            .send_json(self.http.post(self.url("/tasks")).json(&json!({ "data": data })))
            .await?;

        if let Some(section) = &request.targets.section_gid {
            if let Err(e) = self.add_task_to_section(section, &task.gid).await {
                warn!(
                    "Task {} created but not moved to section {}: {}",
                    task.gid, section, e
                );
            }
        }

        info!("✅ Asana task {} created: {}", task.gid, request.title);
        Ok(task)
    }

    pub async fn add_task_to_section(&self, section_gid: &str, task_gid: &str) -> Result<(), TaskError> {
        debug!("Adding task {} to section {}", task_gid, section_gid);
        self.send(
            self.http
                .post(self.url(&format!("/sections/{}/addTask", section_gid)))
                .json(&json!({ "data": { "task": task_gid } })),
        )
        .await?;
        Ok(())
    }

    pub async fn upload_attachment(
        &self,
        task_gid: &str,
        file_name: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<(), TaskError> {
        let size = content.len();
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("file", part);

        self.send(
            self.http
                .post(self.url(&format!("/tasks/{}/attachments", task_gid)))
                .multipart(form),
        )
        .await?;

        info!("📎 Uploaded {} ({} bytes) to task {}", file_name, size, task_gid);
        Ok(())
    }
}

fn classify_error(status: StatusCode, body: &str, retry_after: Option<u64>) -> TaskError {
    let details: AsanaErrorBody = serde_json::from_str(body).unwrap_or_default();
    let messages: Vec<String> = details.errors.into_iter().filter_map(|e| e.message).collect();
    let message = if messages.is_empty() {
        body.trim().chars().take(200).collect()
    } else {
        messages.join("; ")
    };
    let code = status.as_u16();

    match status {
        StatusCode::TOO_MANY_REQUESTS => TaskError::RateLimited { retry_after, message },
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => TaskError::InvalidRequest { status: code, message },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TaskError::Unauthorized { status: code, message },
        _ => TaskError::Api { status: code, message },
    }
}

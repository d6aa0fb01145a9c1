#![allow(dead_code)]

use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use futures::future::BoxFuture;

use outlook_asana::config::{Config, Profile};
use outlook_asana::email::{AttachmentInfo, MailMessage};
use outlook_asana::error::{MailError, TaskError};
use outlook_asana::graph_client::MessageQuery;
use outlook_asana::migration::{MessageSource, TaskSink};
use outlook_asana::task::TaskRequest;

/// Settings builder with overrides, never touching the process environment
pub fn settings(pairs: &[(&str, &str)]) -> config::Config {
    let mut builder = config::Config::builder();
    for (key, value) in pairs {
        builder = builder
            .set_override(*key, *value)
            .expect("valid override");
    }
    builder.build().expect("settings build")
}

pub fn delegated_config(server_uri: &str, profile: Profile) -> Config {
    let graph_base = format!("{}/v1.0", server_uri);
    let asana_base = format!("{}/api/1.0", server_uri);
    Config::from_settings(
        settings(&[
            ("tenant_id", "tenant-1"),
            ("client_id", "client-1"),
            ("auth_mode", "delegated"),
            ("mail_user", "alice@example.com"),
            ("mail_password", "hunter2"),
            ("mail_folder_path", "Inbox/Projects"),
            ("asana_pat", "pat-123"),
            ("asana_workspace_gid", "ws-1"),
            ("asana_project_gid", "proj-1"),
            ("asana_section_gid", "sec-1"),
            ("location_field_gid", "field-loc"),
            ("job_number_field_gid", "field-job"),
            ("migration_delay_ms", "0"),
            ("authority_host", server_uri),
            ("graph_base_url", graph_base.as_str()),
            ("asana_base_url", asana_base.as_str()),
        ]),
        profile,
    )
    .expect("valid test configuration")
}

pub fn message(id: &str, sender: &str, subject: &str, body: &str) -> MailMessage {
    MailMessage {
        id: id.to_string(),
        sender: sender.to_string(),
        subject: subject.to_string(),
        received: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        body: body.to_string(),
        folder_path: vec!["Inbox".to_string(), "Harbor".to_string(), "4410".to_string()],
        attachments: Vec::new(),
    }
}

pub fn query() -> MessageQuery {
    MessageQuery {
        folder_path: vec!["Inbox".to_string()],
        max_messages: None,
        received_since: None,
        include_attachments: false,
    }
}

/// In-memory mailbox
pub struct VecSource {
    pub messages: Vec<MailMessage>,
    pub attachments: Vec<(String, Option<Vec<u8>>)>,
    pub fetch_calls: Mutex<usize>,
}

impl VecSource {
    pub fn new(messages: Vec<MailMessage>) -> Self {
        VecSource {
            messages,
            attachments: Vec::new(),
            fetch_calls: Mutex::new(0),
        }
    }
}

impl MessageSource for VecSource {
    fn fetch_messages<'a>(&'a self, _query: &'a MessageQuery) -> BoxFuture<'a, Result<Vec<MailMessage>, MailError>> {
        Box::pin(async move {
            *self.fetch_calls.lock().unwrap() += 1;
            Ok(self.messages.clone())
        })
    }

    fn fetch_attachment<'a>(
        &'a self,
        _message: &'a MailMessage,
        attachment: &'a AttachmentInfo,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, MailError>> {
        Box::pin(async move {
            Ok(self
                .attachments
                .iter()
                .find(|(id, _)| *id == attachment.id)
                .and_then(|(_, content)| content.clone()))
        })
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}

/// Records every task request; fails for the titles listed in `fail_on`
#[derive(Default)]
pub struct RecordingSink {
    pub fail_on: Vec<String>,
    pub requests: Mutex<Vec<TaskRequest>>,
    pub uploads: Mutex<Vec<(String, String, usize)>>,
}

impl RecordingSink {
    pub fn failing_on(titles: &[&str]) -> Self {
        RecordingSink {
            fail_on: titles.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.title.clone()).collect()
    }
}

impl TaskSink for RecordingSink {
    fn submit_task<'a>(&'a self, request: &'a TaskRequest) -> BoxFuture<'a, Result<String, TaskError>> {
        Box::pin(async move {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            if self.fail_on.contains(&request.title) {
                return Err(TaskError::InvalidRequest {
                    status: 404,
                    message: "project: Not a recognized ID".to_string(),
                });
            }
            Ok(format!("task-{}", requests.len()))
        })
    }

    fn attach_file<'a>(
        &'a self,
        task_id: &'a str,
        file_name: &'a str,
        _content_type: &'a str,
        content: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), TaskError>> {
        Box::pin(async move {
            self.uploads
                .lock()
                .unwrap()
                .push((task_id.to_string(), file_name.to_string(), content.len()));
            Ok(())
        })
    }

    fn sink_name(&self) -> &str {
        "recording"
    }
}

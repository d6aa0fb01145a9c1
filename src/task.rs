use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::AsanaConfig;
use crate::email::text::excerpt;
use crate::email::{extract_metadata, MailMessage};

/// Longest body excerpt copied into the task notes
pub const NOTES_BODY_LIMIT: usize = 8000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Number(i64),
    Text(String),
}

/// Where tasks are created: workspace > project > section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTargets {
    pub workspace_gid: String,
    pub project_gid: String,
    pub section_gid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub title: String,
    pub notes: String,
    pub targets: TaskTargets,
    /// Custom field gid -> value
    pub custom_fields: BTreeMap<String, CustomFieldValue>,
}

/// Maps a fetched message to the task that represents it
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    targets: TaskTargets,
    location_field_gid: Option<String>,
    job_number_field_gid: Option<String>,
}

impl TaskBuilder {
    pub fn new(config: &AsanaConfig) -> Self {
        TaskBuilder {
            targets: TaskTargets {
                workspace_gid: config.workspace_gid.clone(),
                project_gid: config.project_gid.clone(),
                section_gid: config.section_gid.clone(),
            },
            location_field_gid: config.location_field_gid.clone(),
            job_number_field_gid: config.job_number_field_gid.clone(),
        }
    }

    pub fn build(&self, message: &MailMessage) -> TaskRequest {
        let metadata = extract_metadata(&message.subject, &message.body, &message.folder_path);

        let mut notes = String::new();
        if let Some(location) = &metadata.location {
            notes.push_str(&format!("**Location:** {}\n", location));
        }
        if let Some(job) = &metadata.job_number {
            notes.push_str(&format!("**Job #:** {}\n", job));
        }
        notes.push_str(&format!("**From:** {}\n", message.sender));
        notes.push_str(&format!("**Received:** {}\n", message.received.to_rfc3339()));
        if !message.body.is_empty() {
            notes.push('\n');
            notes.push_str(&excerpt(&message.body, NOTES_BODY_LIMIT));
        }

        let mut custom_fields = BTreeMap::new();
        if let (Some(gid), Some(location)) = (&self.location_field_gid, metadata.location) {
            custom_fields.insert(gid.clone(), CustomFieldValue::Text(location));
        }
        if let (Some(gid), Some(job)) = (&self.job_number_field_gid, metadata.job_number) {
            let value = match job.parse::<i64>() {
                Ok(number) => CustomFieldValue::Number(number),
                Err(_) => CustomFieldValue::Text(job),
            };
            custom_fields.insert(gid.clone(), value);
        }

        TaskRequest {
            title: message.subject.clone(),
            notes,
            targets: self.targets.clone(),
            custom_fields,
        }
    }
}

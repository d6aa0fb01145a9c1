/// Common structures for messages fetched from Graph
use chrono::{DateTime, Utc};

use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    File,
    /// Attached Outlook item (email, event), never transferred
    Item,
    /// Link to cloud storage, never transferred
    Reference,
}

#[derive(Debug, Clone)]
pub struct AttachmentInfo {
    pub id: String,
    pub name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub kind: AttachmentKind,
    /// Decoded `contentBytes` when the listing expanded attachments
    pub inline_content: Option<Vec<u8>>,
}

/// Normalized snapshot of one Outlook message
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub received: DateTime<Utc>,
    pub body: String,
    pub folder_path: Vec<String>,
    pub attachments: Vec<AttachmentInfo>,
}

#[derive(Debug, Clone)]
pub struct MessageFailure {
    pub message_id: String,
    pub subject: String,
    pub error: String,
}

/// Result of a migration run
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<MessageFailure>,
    pub attachments_uploaded: usize,
    pub attachments_skipped: usize,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.succeeded += 1;
    }

    pub fn failure(&mut self, message: &MailMessage, error: &TaskError) {
        self.failed += 1;
        self.failures.push(MessageFailure {
            message_id: message.id.clone(),
            subject: message.subject.clone(),
            error: error.to_string(),
        });
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn print_summary(&self) {
        println!("{}", "=".repeat(80));
        println!(
            "🏁 Migration completed: {} task(s) created, {} failure(s) out of {} message(s)",
            self.succeeded,
            self.failed,
            self.total()
        );
        if self.attachments_uploaded > 0 || self.attachments_skipped > 0 {
            println!(
                "📎 Attachments: {} uploaded, {} skipped",
                self.attachments_uploaded, self.attachments_skipped
            );
        }
        for failure in &self.failures {
            println!("   ❌ {} ({}): {}", failure.subject, failure.message_id, failure.error);
        }
        println!("{}", "=".repeat(80));
    }
}

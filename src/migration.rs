use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use log::{debug, error, info, warn};

use crate::asana_client::AsanaClient;
use crate::config::MigrationOptions;
use crate::email::{AttachmentInfo, AttachmentKind, MailMessage, MigrationReport};
use crate::error::{MailError, TaskError};
use crate::graph_client::{GraphClient, MessageQuery};
use crate::task::{TaskBuilder, TaskRequest};

/// Attachments above this size are not transferred
pub const MAX_ATTACHMENT_BYTES: u64 = 3 * 1024 * 1024;

/// Where messages come from
pub trait MessageSource: Send + Sync {
    /// Every message matching the query, in fetch order
    fn fetch_messages<'a>(&'a self, query: &'a MessageQuery) -> BoxFuture<'a, Result<Vec<MailMessage>, MailError>>;

    /// Attachment content, None when the provider refuses it as too large
    fn fetch_attachment<'a>(
        &'a self,
        message: &'a MailMessage,
        attachment: &'a AttachmentInfo,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, MailError>>;

    /// Get the name of this source (for logging)
    fn source_name(&self) -> &str;
}

/// Where tasks go
pub trait TaskSink: Send + Sync {
    /// Create one task and return its identifier
    fn submit_task<'a>(&'a self, request: &'a TaskRequest) -> BoxFuture<'a, Result<String, TaskError>>;

    fn attach_file<'a>(
        &'a self,
        task_id: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        content: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), TaskError>>;

    /// Get the name of this sink (for logging)
    fn sink_name(&self) -> &str;
}

impl MessageSource for GraphClient {
    fn fetch_messages<'a>(&'a self, query: &'a MessageQuery) -> BoxFuture<'a, Result<Vec<MailMessage>, MailError>> {
        Box::pin(self.list_messages(query))
    }

    fn fetch_attachment<'a>(
        &'a self,
        message: &'a MailMessage,
        attachment: &'a AttachmentInfo,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, MailError>> {
        Box::pin(self.download_attachment(message, attachment))
    }

    fn source_name(&self) -> &str {
        "Outlook"
    }
}

impl TaskSink for AsanaClient {
    fn submit_task<'a>(&'a self, request: &'a TaskRequest) -> BoxFuture<'a, Result<String, TaskError>> {
        Box::pin(async move { self.create_task(request).await.map(|task| task.gid) })
    }

    fn attach_file<'a>(
        &'a self,
        task_id: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        content: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), TaskError>> {
        Box::pin(self.upload_attachment(task_id, file_name, content_type, content))
    }

    fn sink_name(&self) -> &str {
        "Asana"
    }
}

/// Prints the tasks instead of creating them (--dry-run)
#[derive(Default)]
pub struct DryRunSink {
    counter: AtomicUsize,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskSink for DryRunSink {
    fn submit_task<'a>(&'a self, request: &'a TaskRequest) -> BoxFuture<'a, Result<String, TaskError>> {
        Box::pin(async move {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            println!("📝 Task #{}: {}", n, request.title);
            println!(
                "   Project: {} | Section: {}",
                request.targets.project_gid,
                request.targets.section_gid.as_deref().unwrap_or("(default)")
            );
            for (gid, value) in &request.custom_fields {
                println!("   Custom field {}: {:?}", gid, value);
            }
            for line in request.notes.lines().take(6) {
                println!("   | {}", line);
            }
            println!();
            Ok(format!("dry-run-{}", n))
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
            println!("   📎 {} ({} bytes) -> {}", file_name, content.len(), task_id);
            Ok(())
        })
    }

    fn sink_name(&self) -> &str {
        "dry-run"
    }
}

/// Moves messages from a source to a sink, one task per message
pub struct Migrator<S: MessageSource, T: TaskSink> {
    source: S,
    sink: T,
    builder: TaskBuilder,
    options: MigrationOptions,
}

impl<S: MessageSource, T: TaskSink> Migrator<S, T> {
    pub fn new(source: S, sink: T, builder: TaskBuilder, options: MigrationOptions) -> Self {
        info!(
            "Initializing migration {} -> {}",
            source.source_name(),
            sink.sink_name()
        );
        Migrator {
            source,
            sink,
            builder,
            options,
        }
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch everything first, then create one task per message in fetch order.
    /// A failed task is recorded and the run goes on.
    pub async fn run(&self, query: &MessageQuery) -> Result<MigrationReport> {
        info!("Starting migration of folder '{}'", query.folder_label());

        let messages = self
            .source
            .fetch_messages(query)
            .await
            .context("Error fetching messages")?;

        let mut report = MigrationReport::new();

        if messages.is_empty() {
            info!("No messages found in folder '{}'", query.folder_label());
            return Ok(report);
        }

        for (index, message) in messages.iter().enumerate() {
            if index > 0 && !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }

            debug!(
                "Message {}/{} (ID: {}) from {}",
                index + 1,
                messages.len(),
                message.id,
                message.sender
            );

            let request = self.builder.build(message);

            match self.sink.submit_task(&request).await {
                Ok(task_id) => {
                    report.success();
                    info!(
                        "Message {}/{} migrated to task {}: {}",
                        index + 1,
                        messages.len(),
                        task_id,
                        message.subject
                    );

                    if self.options.migrate_attachments {
                        self.transfer_attachments(message, &task_id, &mut report).await;
                    }
                }
                Err(e) => {
                    error!("Error migrating message {} ({}): {}", message.id, message.subject, e);
                    report.failure(message, &e);
                }
            }
        }

        info!(
            "Migration completed: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        Ok(report)
    }

    /// Attachment problems are logged, the task itself stays a success
    async fn transfer_attachments(&self, message: &MailMessage, task_id: &str, report: &mut MigrationReport) {
        for attachment in &message.attachments {
            if attachment.kind != AttachmentKind::File {
                debug!("Skipping non-file attachment {}", attachment.name);
                report.attachments_skipped += 1;
                continue;
            }
            if attachment.size > MAX_ATTACHMENT_BYTES {
                warn!("[SKIP] Attachment too large: {} ({} bytes)", attachment.name, attachment.size);
                report.attachments_skipped += 1;
                continue;
            }

            let content = match self.source.fetch_attachment(message, attachment).await {
                Ok(Some(content)) => content,
                Ok(None) => {
                    warn!("[SKIP] Attachment too large: {}", attachment.name);
                    report.attachments_skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Unable to download attachment {}: {}", attachment.name, e);
                    report.attachments_skipped += 1;
                    continue;
                }
            };

            let content_type = attachment
                .content_type
                .as_deref()
                .unwrap_or("application/octet-stream");

            match self
                .sink
                .attach_file(task_id, &attachment.name, content_type, content)
                .await
            {
                Ok(()) => report.attachments_uploaded += 1,
                Err(e) => {
                    warn!("Unable to upload attachment {} to task {}: {}", attachment.name, task_id, e);
                    report.attachments_skipped += 1;
                }
            }
        }
    }
}

pub mod common;
pub mod metadata;
pub mod text;

// Re-export commonly used items
pub use common::{AttachmentInfo, AttachmentKind, MailMessage, MessageFailure, MigrationReport};
pub use metadata::{extract_metadata, MessageMetadata};

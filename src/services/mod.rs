//! Contracts the pipeline holds against its external collaborators.
//!
//! The pipeline only ever talks to a message source, a tabular store and an
//! archive store through these traits. Provider plumbing (mail APIs,
//! spreadsheet backends) lives behind them; `local` ships filesystem-backed
//! implementations so the binary runs end-to-end without any provider.

pub mod local;

use crate::error::IntakeResult;
use crate::types::{ArchivedFile, FieldValue};

/// A handle to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
}

/// One fetched attachment: the original file name and its bytes.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Inbound messages: search, attachment fetch, labeling and notifications.
pub trait MessageSource {
    fn search(&mut self, query: &str, limit: usize) -> IntakeResult<Vec<MessageRef>>;

    /// First attachment matching the configured file-type filter. Fails
    /// with `NoAttachmentFound` when the message has none.
    fn fetch_attachment(&mut self, message_id: &str) -> IntakeResult<Attachment>;

    fn apply_label(&mut self, message_id: &str, label: &str) -> IntakeResult<()>;

    fn mark_read(&mut self, message_id: &str) -> IntakeResult<()>;

    fn send(&mut self, to: &str, subject: &str, body: &str) -> IntakeResult<()>;
}

/// Append-only tabular records with a keyed duplicate lookup. No multi-row
/// atomicity is promised.
pub trait TabularStore {
    fn has_header(&mut self) -> IntakeResult<bool>;

    fn write_header(&mut self, columns: &[&str]) -> IntakeResult<()>;

    fn find_by_key(&mut self, key_column: &str, value: &str) -> IntakeResult<bool>;

    /// Append rows; returns the number written.
    fn append_rows(&mut self, rows: Vec<Vec<FieldValue>>) -> IntakeResult<usize>;
}

/// Folder-hierarchy file archive.
pub trait ArchiveStore {
    /// Ensure the nested folder path exists; returns an opaque folder
    /// handle for uploads.
    fn ensure_path(&mut self, segments: &[String]) -> IntakeResult<String>;

    fn upload(&mut self, folder: &str, bytes: &[u8], name: &str) -> IntakeResult<ArchivedFile>;
}

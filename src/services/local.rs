//! Filesystem-backed collaborators.
//!
//! `LocalInbox` treats a drop folder as the message source: every
//! spreadsheet file is one message whose id is its file name. Labeling
//! moves the file into a per-label subdirectory, which removes it from
//! future searches, the same reprocessing guard a mail provider's labels
//! give. Notifications become text files in an outbox directory.
//! `JsonTableStore` keeps the tabular records as JSON lines (header first),
//! and `DirArchive` materializes the archive hierarchy as directories.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{IntakeError, IntakeResult};
use crate::services::{ArchiveStore, Attachment, MessageRef, MessageSource, TabularStore};
use crate::types::{ArchivedFile, FieldValue};

fn service_error(
    service: &'static str,
    operation: &'static str,
    detail: impl ToString,
) -> IntakeError {
    IntakeError::Service {
        service,
        operation,
        detail: detail.to_string(),
    }
}

//==============================================================================
// Message source
//==============================================================================

pub struct LocalInbox {
    inbox: PathBuf,
    outbox: PathBuf,
    extension: String,
    sent: usize,
}

impl LocalInbox {
    pub fn new(inbox: &Path, outbox: &Path, extension: &str) -> IntakeResult<Self> {
        fs::create_dir_all(inbox)?;
        fs::create_dir_all(outbox)?;
        Ok(Self {
            inbox: inbox.to_path_buf(),
            outbox: outbox.to_path_buf(),
            extension: extension.trim_start_matches('.').to_lowercase(),
            sent: 0,
        })
    }

    fn message_path(&self, message_id: &str) -> PathBuf {
        self.inbox.join(message_id)
    }
}

impl MessageSource for LocalInbox {
    /// Lists unprocessed spreadsheet files, sorted by name. The query
    /// string is accepted for interface parity but a drop folder has
    /// nothing to search; the extension filter stands in for it.
    fn search(&mut self, _query: &str, limit: usize) -> IntakeResult<Vec<MessageRef>> {
        let mut names: Vec<String> = Vec::new();
        for entry in fs::read_dir(&self.inbox)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let matches = Path::new(&name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase() == self.extension)
                .unwrap_or(false);
            if matches {
                names.push(name);
            }
        }
        names.sort();
        names.truncate(limit);
        Ok(names.into_iter().map(|id| MessageRef { id }).collect())
    }

    fn fetch_attachment(&mut self, message_id: &str) -> IntakeResult<Attachment> {
        let path = self.message_path(message_id);
        if !path.is_file() {
            return Err(IntakeError::NoAttachmentFound {
                message_id: message_id.to_string(),
            });
        }
        let bytes = fs::read(&path)?;
        tracing::debug!(file = %message_id, size = bytes.len(), "attachment read");
        Ok(Attachment {
            file_name: message_id.to_string(),
            bytes,
        })
    }

    fn apply_label(&mut self, message_id: &str, label: &str) -> IntakeResult<()> {
        let dir = self.inbox.join(label.replace('/', "-"));
        fs::create_dir_all(&dir)?;
        fs::rename(self.message_path(message_id), dir.join(message_id))
            .map_err(|e| service_error("inbox", "apply_label", e))?;
        tracing::debug!(file = %message_id, label = %label, "message labeled");
        Ok(())
    }

    /// Labeling already moved the file out of the listing; nothing more to
    /// record for a drop folder.
    fn mark_read(&mut self, _message_id: &str) -> IntakeResult<()> {
        Ok(())
    }

    fn send(&mut self, to: &str, subject: &str, body: &str) -> IntakeResult<()> {
        self.sent += 1;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let file = self.outbox.join(format!("{stamp}-{:04}.txt", self.sent));
        let content = format!("To: {to}\nSubject: {subject}\n\n{body}");
        fs::write(&file, content)?;
        tracing::debug!(to = %to, subject = %subject, "notification written to outbox");
        Ok(())
    }
}

//==============================================================================
// Tabular store
//==============================================================================

/// JSON-lines table file: line 0 is the header (a JSON array of column
/// names), every following line one row.
pub struct JsonTableStore {
    path: PathBuf,
}

impl JsonTableStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn lines(&self) -> IntakeResult<Vec<String>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    fn header(&self) -> IntakeResult<Option<Vec<String>>> {
        match self.lines()?.first() {
            Some(line) => {
                let columns: Vec<String> = serde_json::from_str(line)
                    .map_err(|e| service_error("store", "read_header", e))?;
                Ok(Some(columns))
            }
            None => Ok(None),
        }
    }
}

impl TabularStore for JsonTableStore {
    fn has_header(&mut self) -> IntakeResult<bool> {
        Ok(self.header()?.is_some())
    }

    fn write_header(&mut self, columns: &[&str]) -> IntakeResult<()> {
        let line = serde_json::to_string(columns)
            .map_err(|e| service_error("store", "write_header", e))?;
        fs::write(&self.path, format!("{line}\n"))?;
        Ok(())
    }

    fn find_by_key(&mut self, key_column: &str, value: &str) -> IntakeResult<bool> {
        let lines = self.lines()?;
        let Some(header_line) = lines.first() else {
            return Ok(false);
        };
        let columns: Vec<String> = serde_json::from_str(header_line)
            .map_err(|e| service_error("store", "find_by_key", e))?;
        let index = columns
            .iter()
            .position(|c| c == key_column)
            .ok_or_else(|| service_error("store", "find_by_key", format!("no column '{key_column}'")))?;

        let needle = value.trim();
        for line in &lines[1..] {
            let row: Vec<serde_json::Value> = serde_json::from_str(line)
                .map_err(|e| service_error("store", "find_by_key", e))?;
            let cell = match row.get(index) {
                Some(serde_json::Value::String(s)) => s.trim().to_string(),
                Some(other) => other.to_string(),
                None => continue,
            };
            if cell == needle {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn append_rows(&mut self, rows: Vec<Vec<FieldValue>>) -> IntakeResult<usize> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let count = rows.len();
        for row in rows {
            let line = serde_json::to_string(&row)
                .map_err(|e| service_error("store", "append_rows", e))?;
            writeln!(file, "{line}")?;
        }
        Ok(count)
    }
}

//==============================================================================
// Archive store
//==============================================================================

pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ArchiveStore for DirArchive {
    fn ensure_path(&mut self, segments: &[String]) -> IntakeResult<String> {
        let mut path = self.root.clone();
        for segment in segments {
            path.push(segment);
        }
        fs::create_dir_all(&path)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn upload(&mut self, folder: &str, bytes: &[u8], name: &str) -> IntakeResult<ArchivedFile> {
        let path = Path::new(folder).join(name);
        fs::write(&path, bytes)?;
        let location = path.to_string_lossy().into_owned();
        tracing::debug!(path = %location, "file archived");
        Ok(ArchivedFile {
            id: location.clone(),
            name: name.to_string(),
            link: location,
        })
    }
}

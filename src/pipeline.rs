//! The per-submission processing pipeline.
//!
//! For each inbound message: fetch the attachment, assemble the submission,
//! check for a duplicate, persist one row per line item, archive the
//! original file, notify the outcome, and label the source message. A
//! failure in any of the first five steps routes the message to the failure
//! branch; it never aborts the batch. Every message ends labeled exactly
//! once (Processed, Duplicate or Error), which is what prevents
//! reprocessing on the next run.

use chrono::{Datelike, Local, NaiveDate};
use std::io::Write;

use crate::assembler::assemble;
use crate::config::Config;
use crate::error::{IntakeError, IntakeResult};
use crate::notify;
use crate::registry::Registry;
use crate::services::{ArchiveStore, Attachment, MessageRef, MessageSource, TabularStore};
use crate::types::{ArchivedFile, FieldValue, ProcessingOutcome, Submission};

/// Fixed column layout of the tabular store. Item fields are positional:
/// the five slots after "Item No" hold whatever the variant's mapping
/// declares, shorter variants padded with empty values.
pub const STORE_COLUMNS: [&str; 14] = [
    "Processed At",
    "Form Number",
    "Form Date",
    "Form Kind",
    "Requester",
    "Department",
    "Item No",
    "Description / Service / Concept",
    "Quantity / Provider / Category",
    "Unit / Amount",
    "Unit Price / Date",
    "Total",
    "Notes",
    "Source File",
];

/// Column used for the duplicate lookup.
pub const KEY_COLUMN: &str = "Form Number";

const ITEM_FIELD_SLOTS: usize = 5;

/// Per-run outcome counts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub duplicates: usize,
    pub failures: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Success { .. } => self.processed += 1,
            ProcessingOutcome::Duplicate { .. } => self.duplicates += 1,
            ProcessingOutcome::Failure { .. } => self.failures += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.processed + self.duplicates + self.failures
    }
}

/// Batch processor over the three collaborator contracts.
pub struct Pipeline<'a, M, T, A> {
    source: &'a mut M,
    store: &'a mut T,
    archive: &'a mut A,
    config: &'a Config,
    registry: &'a Registry,
}

impl<'a, M, T, A> Pipeline<'a, M, T, A>
where
    M: MessageSource,
    T: TabularStore,
    A: ArchiveStore,
{
    pub fn new(
        source: &'a mut M,
        store: &'a mut T,
        archive: &'a mut A,
        config: &'a Config,
        registry: &'a Registry,
    ) -> Self {
        Self {
            source,
            store,
            archive,
            config,
            registry,
        }
    }

    /// Process one batch: ensure the store header, search for messages,
    /// run each through the per-message flow, and tally the outcomes.
    pub fn run(&mut self) -> IntakeResult<RunSummary> {
        self.ensure_store_header()?;

        let messages = self
            .source
            .search(&self.config.search_query, self.config.max_messages)?;
        tracing::info!(count = messages.len(), "messages to process");

        let mut summary = RunSummary::default();
        for (index, message) in messages.iter().enumerate() {
            tracing::info!(
                message = %message.id,
                n = index + 1,
                total = messages.len(),
                "processing message"
            );
            let outcome = self.process_message(message);
            summary.record(&outcome);
        }

        tracing::info!(
            processed = summary.processed,
            duplicates = summary.duplicates,
            failures = summary.failures,
            "run complete"
        );
        Ok(summary)
    }

    fn ensure_store_header(&mut self) -> IntakeResult<()> {
        if !self.store.has_header()? {
            tracing::info!("writing tabular store header");
            self.store.write_header(&STORE_COLUMNS)?;
        }
        Ok(())
    }

    /// Per-message boundary: every error from fetch through archive lands
    /// here and becomes a Failure outcome; the batch continues.
    fn process_message(&mut self, message: &MessageRef) -> ProcessingOutcome {
        match self.source.fetch_attachment(&message.id) {
            Ok(attachment) => {
                let file_name = attachment.file_name.clone();
                match self.process_attachment(message, attachment) {
                    Ok(outcome) => outcome,
                    Err(err) => self.fail(message, &err, &file_name),
                }
            }
            Err(err) => self.fail(message, &err, "unknown"),
        }
    }

    fn process_attachment(
        &mut self,
        message: &MessageRef,
        attachment: Attachment,
    ) -> IntakeResult<ProcessingOutcome> {
        // The temp copy is dropped, and thereby deleted, on every exit path
        // of this function.
        let mut temp = tempfile::Builder::new()
            .prefix("intake-")
            .suffix(".xlsx")
            .tempfile()?;
        temp.write_all(&attachment.bytes)?;
        temp.flush()?;

        let mut submission = assemble(temp.path(), &attachment.file_name, self.registry)?;
        let form_number = submission.form_number();

        if self.store.find_by_key(KEY_COLUMN, &form_number)? {
            tracing::warn!(form_number = %form_number, "duplicate submission");
            let (subject, body) = notify::duplicate_message(
                &self.config.templates,
                &form_number,
                &submission.requester(),
            );
            self.send(&subject, &body);
            self.finalize(&message.id, &self.config.labels.duplicate.clone());
            return Ok(ProcessingOutcome::Duplicate { form_number });
        }

        let rows = build_rows(&submission);
        let rows_written = self.store.append_rows(rows)?;
        tracing::info!(rows = rows_written, "rows recorded");

        let archived = self.archive_submission(&attachment.bytes, &submission)?;
        tracing::info!(name = %archived.name, "original file archived");
        submission.archive = Some(archived);

        let (subject, body) = notify::success_message(&self.config.templates, &submission);
        self.send(&subject, &body);
        self.finalize(&message.id, &self.config.labels.processed.clone());

        tracing::info!(form_number = %form_number, "message processed");
        Ok(ProcessingOutcome::Success { rows_written })
    }

    fn archive_submission(
        &mut self,
        bytes: &[u8],
        submission: &Submission,
    ) -> IntakeResult<ArchivedFile> {
        let date = submission.form_date_or_today();
        let segments = [
            self.config.archive_root.clone(),
            format!("{:04}", date.year()),
            format!("{:02}", date.month()),
        ];
        let folder = self.archive.ensure_path(&segments)?;
        let name = archive_file_name(submission, date);
        self.archive.upload(&folder, bytes, &name)
    }

    fn fail(
        &mut self,
        message: &MessageRef,
        err: &IntakeError,
        file_name: &str,
    ) -> ProcessingOutcome {
        tracing::error!(message = %message.id, error = %err, "message failed");
        let (subject, body) =
            notify::failure_message(&self.config.templates, &err.to_string(), file_name);
        self.send(&subject, &body);
        self.finalize(&message.id, &self.config.labels.error.clone());
        ProcessingOutcome::Failure {
            category: err.category(),
            message: err.to_string(),
        }
    }

    /// Notification failures are logged, never escalated.
    fn send(&mut self, subject: &str, body: &str) {
        if let Err(err) = self.source.send(&self.config.notify_to, subject, body) {
            tracing::warn!(error = %err, "could not send notification");
        }
    }

    /// Label and mark the message read. A labeling failure means the
    /// message may be picked up again next run; log it loudly and move on.
    fn finalize(&mut self, message_id: &str, label: &str) {
        if let Err(err) = self.source.apply_label(message_id, label) {
            tracing::error!(message = %message_id, error = %err, "could not label message");
            return;
        }
        if let Err(err) = self.source.mark_read(message_id) {
            tracing::error!(message = %message_id, error = %err, "could not mark message read");
        }
    }
}

/// One store row per line item: the shared header fields followed by the
/// item's positional fields. The form number column holds the display
/// string; the duplicate lookup compares display strings.
pub fn build_rows(submission: &Submission) -> Vec<Vec<FieldValue>> {
    let processed_at = FieldValue::Text(Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    let header = &submission.header;
    let form_number = FieldValue::Text(submission.form_number());
    let kind = FieldValue::Text(submission.kind.to_string());
    let source_file = FieldValue::Text(submission.source_file.clone());

    let header_field = |name: &str| header.get(name).cloned().unwrap_or(FieldValue::Empty);

    submission
        .items
        .iter()
        .map(|item| {
            let mut row = Vec::with_capacity(STORE_COLUMNS.len());
            row.push(processed_at.clone());
            row.push(form_number.clone());
            row.push(header_field("form_date"));
            row.push(kind.clone());
            row.push(header_field("requester"));
            row.push(header_field("department"));
            row.push(item.key().clone());
            for slot in 0..ITEM_FIELD_SLOTS {
                row.push(item.slot(slot));
            }
            row.push(header_field("notes"));
            row.push(source_file.clone());
            row
        })
        .collect()
}

/// Canonical archive name: `YYYY-MM-DD_Form-<number>_<requester>.<ext>`,
/// requester stripped to alphanumerics, spaces, hyphens and underscores,
/// spaces replaced with underscores.
pub fn archive_file_name(submission: &Submission, date: NaiveDate) -> String {
    let requester = sanitize_requester(&submission.requester());
    let extension = std::path::Path::new(&submission.source_file)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "xlsx".to_string());
    format!(
        "{}_Form-{}_{}.{}",
        date.format("%Y-%m-%d"),
        submission.form_number(),
        requester,
        extension
    )
}

fn sanitize_requester(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let cleaned = kept.trim().replace(' ', "_");
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FormKind, LineItem, SubmissionHeader};

    fn submission(items: Vec<LineItem>) -> Submission {
        Submission {
            kind: FormKind::Servicios,
            header: SubmissionHeader {
                fields: vec![
                    (
                        "form_number".to_string(),
                        FieldValue::Text("R60-002".to_string()),
                    ),
                    (
                        "form_date".to_string(),
                        FieldValue::Date(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()),
                    ),
                    (
                        "requester".to_string(),
                        FieldValue::Text("Jane Doe".to_string()),
                    ),
                    ("department".to_string(), FieldValue::Text("IT".to_string())),
                    ("notes".to_string(), FieldValue::Empty),
                ],
            },
            items,
            source_file: "services.xlsx".to_string(),
            archive: None,
        }
    }

    fn item() -> LineItem {
        LineItem {
            fields: vec![
                ("item_no".to_string(), FieldValue::Number(1.0)),
                (
                    "service".to_string(),
                    FieldValue::Text("Cleaning".to_string()),
                ),
                ("provider".to_string(), FieldValue::Text("ACME".to_string())),
                ("amount".to_string(), FieldValue::Number(150.0)),
                (
                    "service_date".to_string(),
                    FieldValue::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
                ),
            ],
        }
    }

    #[test]
    fn test_sanitize_requester() {
        assert_eq!(sanitize_requester("Jane Doe"), "Jane_Doe");
        assert_eq!(sanitize_requester("J. O'Brien (ops)"), "J_OBrien_ops");
        assert_eq!(sanitize_requester("  María-José  "), "María-José");
        assert_eq!(sanitize_requester("///"), "Unknown");
    }

    #[test]
    fn test_archive_file_name() {
        let sub = submission(vec![item()]);
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(
            archive_file_name(&sub, date),
            "2025-03-14_Form-R60-002_Jane_Doe.xlsx"
        );
    }

    #[test]
    fn test_build_rows_pads_item_slots() {
        let rows = build_rows(&submission(vec![item(), item()]));
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), STORE_COLUMNS.len());
        }
        let row = &rows[0];
        assert_eq!(row[1], FieldValue::Text("R60-002".to_string()));
        assert_eq!(row[3], FieldValue::Text("SERVICIOS".to_string()));
        assert_eq!(row[6], FieldValue::Number(1.0));
        assert_eq!(row[7], FieldValue::Text("Cleaning".to_string()));
        // Service forms map four fields past the key; the fifth slot pads.
        assert_eq!(row[11], FieldValue::Empty);
        assert_eq!(row[13], FieldValue::Text("services.xlsx".to_string()));
    }

    #[test]
    fn test_run_summary_tallies_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(&ProcessingOutcome::Success { rows_written: 2 });
        summary.record(&ProcessingOutcome::Duplicate {
            form_number: "R60-001".to_string(),
        });
        summary.record(&ProcessingOutcome::Failure {
            category: "validation",
            message: "bad".to_string(),
        });
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.total(), 3);
    }
}

//! Submission assembly: classify a spreadsheet, extract its header and
//! items, and validate the result into a [`Submission`].

use std::path::Path;

use crate::classifier::{classify, CONTENT_SCAN_ROWS};
use crate::error::{IntakeError, IntakeResult};
use crate::extractor::{extract_header, extract_items, Sheet};
use crate::registry::Registry;
use crate::types::Submission;

/// Parse one spreadsheet file into a submission.
///
/// Sequence: load the first worksheet → classify → extract header →
/// extract items → reject an empty item table. Classification and
/// extraction failures propagate unchanged; the empty-table check runs
/// after header extraction so the error can name the form number.
pub fn assemble(path: &Path, file_name: &str, registry: &Registry) -> IntakeResult<Submission> {
    tracing::info!(file = %file_name, "parsing form");

    let sheet = Sheet::load(path)?;

    let kind = classify(registry, sheet.name(), &sheet.preview_rows(CONTENT_SCAN_ROWS))?;
    tracing::info!(kind = %kind, "form type identified");

    let variant = registry.lookup(kind)?;
    let header = extract_header(&sheet, variant)?;

    let scan = extract_items(&sheet, variant);
    if scan.truncated {
        tracing::warn!(
            form_number = %header.display("form_number"),
            "item table was truncated at the scan limit; verify the item count"
        );
    }
    if scan.items.is_empty() {
        return Err(IntakeError::EmptyItemTable {
            form_number: header.display("form_number"),
        });
    }

    tracing::info!(items = scan.items.len(), "form parsed");

    Ok(Submission {
        kind,
        header,
        items: scan.items,
        source_file: file_name.to_string(),
        archive: None,
    })
}

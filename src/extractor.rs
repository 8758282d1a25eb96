//! Field extraction from classified sheets.
//!
//! A [`Sheet`] wraps one worksheet's cell range. Header fields are read at
//! fixed coordinates from the variant's mapping; line items are read row by
//! row from the variant's item table until the key column goes blank. Cell
//! values are normalized to [`FieldValue`] on the way out.

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::Path;

use crate::error::{IntakeError, IntakeResult};
use crate::registry::{FormVariant, MANDATORY_HEADER_FIELDS};
use crate::types::{CellRef, FieldValue, LineItem, SubmissionHeader};

/// Safety bound on the item-table scan: rows past this count are never
/// read, so a sheet with thousands of stray non-empty key cells cannot
/// stall a run. Hitting the bound is reported, not treated as an error.
pub const MAX_ITEM_ROWS: u32 = 1000;

/// One worksheet: its name and cell range.
pub struct Sheet {
    name: String,
    range: Range<Data>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, range: Range<Data>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    /// Load the first worksheet of an `.xlsx` file.
    pub fn load(path: &Path) -> IntakeResult<Self> {
        let mut workbook: Xlsx<_> = open_workbook::<Xlsx<_>, _>(path).map_err(|e| {
            IntakeError::InvalidSpreadsheet {
                path: path.display().to_string(),
                detail: e.to_string(),
            }
        })?;

        let sheet_name = workbook
            .sheet_names()
            .to_vec()
            .into_iter()
            .next()
            .ok_or_else(|| IntakeError::InvalidSpreadsheet {
                path: path.display().to_string(),
                detail: "workbook has no sheets".to_string(),
            })?;

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            IntakeError::InvalidSpreadsheet {
                path: path.display().to_string(),
                detail: e.to_string(),
            }
        })?;

        tracing::debug!(sheet = %sheet_name, "workbook loaded");
        Ok(Self::new(sheet_name, range))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized value of the cell at `at`; `Empty` outside the used range.
    pub fn cell(&self, at: CellRef) -> FieldValue {
        match self.range.get_value(at.position()) {
            Some(data) => normalize(data),
            None => FieldValue::Empty,
        }
    }

    /// Text of the first `rows` sheet rows, one string per row, empty cells
    /// skipped, cells joined with a space. Rows with no text are omitted.
    pub fn preview_rows(&self, rows: u32) -> Vec<String> {
        let Some((end_row, end_col)) = self.range.end() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for row in 0..rows.min(end_row + 1) {
            let mut cells = Vec::new();
            for col in 0..=end_col {
                if let Some(data) = self.range.get_value((row, col)) {
                    if !matches!(data, Data::Empty) {
                        cells.push(data.to_string());
                    }
                }
            }
            if !cells.is_empty() {
                out.push(cells.join(" "));
            }
        }
        out
    }
}

/// Normalize a raw cell to its stable representation: dates to calendar
/// dates, numbers kept numeric, text trimmed, everything unreadable empty.
fn normalize(data: &Data) -> FieldValue {
    match data {
        Data::Empty => FieldValue::Empty,
        Data::String(s) => FieldValue::text(s),
        Data::Float(f) => FieldValue::Number(*f),
        Data::Int(i) => FieldValue::Number(*i as f64),
        Data::Bool(b) => FieldValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => FieldValue::Date(ndt.date()),
            None => FieldValue::Empty,
        },
        Data::DateTimeIso(s) => match s.get(..10).and_then(parse_iso_date) {
            Some(date) => FieldValue::Date(date),
            None => FieldValue::text(s),
        },
        Data::DurationIso(s) => FieldValue::text(s),
        Data::Error(_) => FieldValue::Empty,
    }
}

fn parse_iso_date(s: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Read every header field declared by the variant, then verify the
/// mandatory ones are non-empty. The first missing mandatory field, in
/// mapping declaration order, is reported with its cell.
pub fn extract_header(sheet: &Sheet, variant: &FormVariant) -> IntakeResult<SubmissionHeader> {
    let mut fields = Vec::with_capacity(variant.header.len());
    for (name, cell) in &variant.header {
        let value = sheet.cell(*cell);
        tracing::debug!(field = %name, cell = %cell, value = %value, "header field");
        fields.push((name.clone(), value));
    }

    let header = SubmissionHeader { fields };

    for (name, cell) in &variant.header {
        if !MANDATORY_HEADER_FIELDS.contains(&name.as_str()) {
            continue;
        }
        let missing = header.get(name).map(|v| v.is_empty()).unwrap_or(true);
        if missing {
            return Err(IntakeError::MissingRequiredField {
                field: name.clone(),
                cell: cell.to_string(),
            });
        }
    }

    Ok(header)
}

/// Result of the item-table scan.
pub struct ItemScan {
    pub items: Vec<LineItem>,
    /// True when the scan stopped at [`MAX_ITEM_ROWS`] instead of a blank
    /// key cell.
    pub truncated: bool,
}

/// Walk the item table from the variant's start row. The scan stops at the
/// first row whose key cell is empty or whitespace-only; rows after it are
/// not part of the table.
pub fn extract_items(sheet: &Sheet, variant: &FormVariant) -> ItemScan {
    let key_col = variant.item_columns[0].1;
    let mut items = Vec::new();
    let mut row = variant.items_start_row;

    loop {
        if row - variant.items_start_row >= MAX_ITEM_ROWS {
            tracing::warn!(
                limit = MAX_ITEM_ROWS,
                "item scan reached the row limit; remaining rows ignored"
            );
            return ItemScan {
                items,
                truncated: true,
            };
        }

        let key = sheet.cell(CellRef::new(key_col, row));
        if key.is_empty() {
            tracing::debug!(row, count = items.len(), "end of item table");
            return ItemScan {
                items,
                truncated: false,
            };
        }

        let fields = variant
            .item_columns
            .iter()
            .map(|(name, col)| (name.clone(), sheet.cell(CellRef::new(*col, row))))
            .collect();
        items.push(LineItem { fields });
        row += 1;
    }
}

use chrono::{Local, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::IntakeError;

//==============================================================================
// Cell addressing
//==============================================================================

/// A (column, row) address into a sheet. Columns are 0-based indices
/// internally but parse from / display as Excel letters; rows are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Parse an "A1"-style reference. Returns `None` for malformed input.
    pub fn parse(s: &str) -> Option<Self> {
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        let col = column_index(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self { col, row })
    }

    /// Absolute (row, col) position for range lookups, both 0-based.
    pub(crate) fn position(&self) -> (u32, u32) {
        (self.row - 1, self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.col), self.row)
    }
}

/// Convert column letters to a 0-based index (A→0, B→1, AA→26).
pub(crate) fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        index = index * 26 + digit;
    }
    Some(index - 1)
}

/// Convert a 0-based column index to Excel letters (0→A, 25→Z, 26→AA).
pub(crate) fn column_letter(n: u32) -> String {
    let mut result = String::new();
    let mut num = n;

    loop {
        let remainder = num % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }

    result
}

//==============================================================================
// Normalized cell values
//==============================================================================

/// A cell value normalized to a stable representation: empty cells become
/// `Empty`, text is trimmed (whitespace-only text collapses to `Empty`),
/// numbers are preserved as-is, dates carry a calendar date that displays
/// as ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Build a `Text` value, normalizing whitespace-only input to `Empty`.
    pub fn text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(trimmed.to_string())
        }
    }
}

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    // Round to 6 decimal places for display (sufficient for quantities and
    // monetary amounts)
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => f.write_str(&format_number(*n)),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Empty => serializer.serialize_str(""),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

//==============================================================================
// Form variants
//==============================================================================

/// The recognized form layouts. Adding a layout means adding a descriptor to
/// the registry, never subclassing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Compras,
    Servicios,
    Costos,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Compras => "COMPRAS",
            FormKind::Servicios => "SERVICIOS",
            FormKind::Costos => "COSTOS",
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormKind {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COMPRAS" => Ok(FormKind::Compras),
            "SERVICIOS" => Ok(FormKind::Servicios),
            "COSTOS" => Ok(FormKind::Costos),
            other => Err(IntakeError::UnknownVariant(other.to_string())),
        }
    }
}

//==============================================================================
// Submissions
//==============================================================================

/// Header fields extracted once per submission, in the variant's mapping
/// declaration order. Every declared field is present, possibly `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionHeader {
    pub fields: Vec<(String, FieldValue)>,
}

impl SubmissionHeader {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Display form of a field; empty string when absent or `Empty`.
    pub fn display(&self, name: &str) -> String {
        self.get(name).map(|v| v.to_string()).unwrap_or_default()
    }
}

/// One occupied row of the item table, in the variant's column mapping
/// order. The first field is the item key; it is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub fields: Vec<(String, FieldValue)>,
}

impl LineItem {
    /// The key-column value (first mapped column).
    pub fn key(&self) -> &FieldValue {
        &self.fields[0].1
    }

    /// Positional field access past the key column; `Empty` beyond the
    /// variant's mapped columns.
    pub fn slot(&self, index: usize) -> FieldValue {
        self.fields
            .get(index + 1)
            .map(|(_, value)| value.clone())
            .unwrap_or(FieldValue::Empty)
    }
}

/// Reference to the archived copy of a source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedFile {
    pub id: String,
    pub name: String,
    pub link: String,
}

/// One fully extracted form instance: classification, header, line items
/// and the originating file name. Not mutated after assembly except to
/// attach the archived-file reference once the rows are persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub kind: FormKind,
    pub header: SubmissionHeader,
    pub items: Vec<LineItem>,
    pub source_file: String,
    pub archive: Option<ArchivedFile>,
}

impl Submission {
    pub fn form_number(&self) -> String {
        self.header.display("form_number")
    }

    pub fn requester(&self) -> String {
        self.header.display("requester")
    }

    /// The form date, falling back to the current date when the cell is
    /// empty or not parsable as a calendar date.
    pub fn form_date_or_today(&self) -> NaiveDate {
        match self.header.get("form_date") {
            Some(FieldValue::Date(d)) => *d,
            Some(value) => NaiveDate::parse_from_str(&value.to_string(), "%Y-%m-%d")
                .unwrap_or_else(|_| Local::now().date_naive()),
            None => Local::now().date_naive(),
        }
    }

    /// JSON view for CLI output.
    pub fn to_json(&self) -> serde_json::Value {
        let header: serde_json::Map<String, serde_json::Value> = self
            .header
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::json!(value)))
            .collect();
        let items: Vec<serde_json::Value> = self
            .items
            .iter()
            .map(|item| {
                let fields: serde_json::Map<String, serde_json::Value> = item
                    .fields
                    .iter()
                    .map(|(name, value)| (name.clone(), serde_json::json!(value)))
                    .collect();
                serde_json::Value::Object(fields)
            })
            .collect();
        serde_json::json!({
            "form_kind": self.kind.as_str(),
            "header": header,
            "items": items,
            "source_file": self.source_file,
            "archive": self.archive,
        })
    }
}

//==============================================================================
// Pipeline outcomes
//==============================================================================

/// Terminal result of processing one inbound message. Selects the
/// notification template and the status label.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    Success { rows_written: usize },
    Duplicate { form_number: String },
    Failure { category: &'static str, message: String },
}

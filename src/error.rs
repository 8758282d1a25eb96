use thiserror::Error;

pub type IntakeResult<T> = Result<T, IntakeError>;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("spreadsheet '{path}' is invalid or unreadable: {detail}")]
    InvalidSpreadsheet { path: String, detail: String },

    #[error("could not identify the form type of sheet '{sheet}' (expected one of: COMPRAS, SERVICIOS, COSTOS)")]
    UnrecognizedFormType { sheet: String },

    #[error("required field '{field}' is empty or missing (cell {cell})")]
    MissingRequiredField { field: String, cell: String },

    #[error("form {form_number} contains no line items")]
    EmptyItemTable { form_number: String },

    #[error("form {form_number} has already been recorded; duplicates are not allowed")]
    DuplicateSubmission { form_number: String },

    #[error("no spreadsheet attachment found on message {message_id}")]
    NoAttachmentFound { message_id: String },

    #[error("unknown form variant: {0}")]
    UnknownVariant(String),

    #[error("form registry error: {0}")]
    Registry(String),

    #[error("{service} error during '{operation}': {detail}")]
    Service {
        service: &'static str,
        operation: &'static str,
        detail: String,
    },
}

impl IntakeError {
    /// Coarse category used by `ProcessingOutcome::Failure` and the failure
    /// notification.
    pub fn category(&self) -> &'static str {
        match self {
            IntakeError::Io(_) => "io",
            IntakeError::Yaml(_) | IntakeError::Config(_) => "config",
            IntakeError::InvalidSpreadsheet { .. }
            | IntakeError::UnrecognizedFormType { .. }
            | IntakeError::MissingRequiredField { .. }
            | IntakeError::EmptyItemTable { .. } => "validation",
            IntakeError::DuplicateSubmission { .. } => "duplicate",
            IntakeError::NoAttachmentFound { .. } => "attachment",
            IntakeError::UnknownVariant(_) | IntakeError::Registry(_) => "registry",
            IntakeError::Service { .. } => "service",
        }
    }
}

//! Runtime configuration.
//!
//! All knobs have working defaults; a YAML file can override any subset.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IntakeError, IntakeResult};

/// Full configuration surface consumed by the pipeline and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Message-source search query for inbound form messages.
    pub search_query: String,
    /// Maximum messages processed per run.
    pub max_messages: usize,
    /// Attachment file extension accepted by the fetch step.
    pub attachment_extension: String,
    /// Recipient of outcome notifications.
    pub notify_to: String,
    /// Root folder name of the archive hierarchy (`<root>/YYYY/MM`).
    pub archive_root: String,
    pub labels: Labels,
    pub templates: Templates,
    pub local: LocalPaths,
}

/// Status labels applied to source messages, one per outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub processed: String,
    pub error: String,
    pub duplicate: String,
}

/// Filesystem locations for the local collaborator implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalPaths {
    pub inbox_dir: PathBuf,
    pub outbox_dir: PathBuf,
    pub store_path: PathBuf,
    pub archive_dir: PathBuf,
}

/// Notification templates. Placeholders in `{braces}` are substituted at
/// send time; see `notify` for the available names per outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    pub success_subject: String,
    pub success_body: String,
    pub duplicate_subject: String,
    pub duplicate_body: String,
    pub failure_subject: String,
    pub failure_body: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_query: "subject:form has:attachment filename:xlsx is:unread".to_string(),
            max_messages: 10,
            attachment_extension: "xlsx".to_string(),
            notify_to: String::new(),
            archive_root: "PROCESSED_FORMS".to_string(),
            labels: Labels::default(),
            templates: Templates::default(),
            local: LocalPaths::default(),
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            processed: "Forms/Processed".to_string(),
            error: "Forms/Error".to_string(),
            duplicate: "Forms/Duplicate".to_string(),
        }
    }
}

impl Default for LocalPaths {
    fn default() -> Self {
        Self {
            inbox_dir: PathBuf::from("inbox"),
            outbox_dir: PathBuf::from("outbox"),
            store_path: PathBuf::from("ledger.jsonl"),
            archive_dir: PathBuf::from("archive"),
        }
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            success_subject: "Form {form_number} processed".to_string(),
            success_body: "\
Form {form_number} was processed and recorded.

  Number:    {form_number}
  Date:      {form_date}
  Requester: {requester}
  Kind:      {form_kind}
  Items:     {item_count}
  Archived:  {archive_link}

This is an automated message.
"
            .to_string(),
            duplicate_subject: "Duplicate form {form_number}".to_string(),
            duplicate_body: "\
Form {form_number} (requester: {requester}) was already recorded.
No rows were written. Contact the administrator to amend a recorded form.

This is an automated message.
"
            .to_string(),
            failure_subject: "Form processing failed: {file_name}".to_string(),
            failure_body: "\
Could not process {file_name}.

  Error: {error_message}

Please correct the form and resubmit it. If the problem persists,
contact the system administrator.

This is an automated message.
"
            .to_string(),
        }
    }
}

impl Config {
    /// Load configuration: defaults when no file is given, otherwise the
    /// YAML file with defaults filling any omitted keys.
    pub fn load(path: Option<&Path>) -> IntakeResult<Self> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p)?;
                Ok(serde_yaml::from_str(&text)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> IntakeResult<()> {
        if self.notify_to.is_empty() {
            return Err(IntakeError::Config(
                "notify_to is not set; outcome notifications need a recipient".to_string(),
            ));
        }
        if self.max_messages == 0 {
            return Err(IntakeError::Config("max_messages must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_a_recipient() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.notify_to = "operations@example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_overrides_keep_defaults() {
        let yaml = "notify_to: ops@example.com\nmax_messages: 3\nlabels:\n  processed: Done\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.notify_to, "ops@example.com");
        assert_eq!(config.max_messages, 3);
        assert_eq!(config.labels.processed, "Done");
        // Untouched keys fall back to defaults.
        assert_eq!(config.labels.error, "Forms/Error");
        assert_eq!(config.archive_root, "PROCESSED_FORMS");
        assert_eq!(config.attachment_extension, "xlsx");
    }

    #[test]
    fn test_zero_message_limit_rejected() {
        let mut config = Config::default();
        config.notify_to = "ops@example.com".to_string();
        config.max_messages = 0;
        assert!(config.validate().is_err());
    }
}

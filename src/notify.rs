//! Outcome notification messages.
//!
//! One (subject, body) pair per outcome, rendered from the configured
//! templates by plain `{placeholder}` substitution.

use crate::config::Templates;
use crate::types::Submission;

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Message for a successfully recorded submission. `{archive_link}` falls
/// back to the archived file name when no link is available.
pub fn success_message(templates: &Templates, submission: &Submission) -> (String, String) {
    let number = submission.form_number();
    let date = submission.header.display("form_date");
    let requester = submission.requester();
    let kind = submission.kind.to_string();
    let item_count = submission.items.len().to_string();
    let archive_link = submission
        .archive
        .as_ref()
        .map(|a| {
            if a.link.is_empty() {
                a.name.clone()
            } else {
                a.link.clone()
            }
        })
        .unwrap_or_default();

    let vars: [(&str, &str); 6] = [
        ("form_number", &number),
        ("form_date", &date),
        ("requester", &requester),
        ("form_kind", &kind),
        ("item_count", &item_count),
        ("archive_link", &archive_link),
    ];
    (
        render(&templates.success_subject, &vars),
        render(&templates.success_body, &vars),
    )
}

pub fn duplicate_message(
    templates: &Templates,
    form_number: &str,
    requester: &str,
) -> (String, String) {
    let vars: [(&str, &str); 2] = [("form_number", form_number), ("requester", requester)];
    (
        render(&templates.duplicate_subject, &vars),
        render(&templates.duplicate_body, &vars),
    )
}

pub fn failure_message(
    templates: &Templates,
    error_message: &str,
    file_name: &str,
) -> (String, String) {
    let vars: [(&str, &str); 2] = [("error_message", error_message), ("file_name", file_name)];
    (
        render(&templates.failure_subject, &vars),
        render(&templates.failure_body, &vars),
    )
}

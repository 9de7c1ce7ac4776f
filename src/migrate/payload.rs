use crate::config::MigrationConfig;
use crate::model::payload::{IdRef, IssueFields, IssuePayload, NameRef, PriorityRef, UserRef};
use crate::model::record::{JiraPriority, SourceRecord};

/// Number of description characters kept in a summary.
pub const SUMMARY_CHARS: usize = 66;

pub fn build_payload(record: &SourceRecord, config: &MigrationConfig) -> IssuePayload {
    IssuePayload {
        fields: IssueFields {
            project: IdRef {
                id: config.project_id.clone(),
            },
            issuetype: NameRef {
                name: config.issue_type.clone(),
            },
            priority: PriorityRef {
                name: JiraPriority::from(&record.priority),
            },
            assignee: UserRef { name: None },
            reporter: UserRef {
                name: Some(config.reporter.clone()),
            },
            components: vec![IdRef {
                id: config.component_id.clone(),
            }],
            summary: summarize(&record.description),
            description: describe(record),
            labels: record.tags.clone(),
        },
    }
}

/// First [`SUMMARY_CHARS`] characters of the description plus `...`.
///
/// The ellipsis is appended even when nothing was cut off.
pub fn summarize(description: &str) -> String {
    let mut summary: String = description
        .chars()
        .take(SUMMARY_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    summary.push_str("...");
    summary
}

/// True when [`summarize`] adds an ellipsis to an untruncated description.
pub fn is_padded_summary(description: &str) -> bool {
    description.chars().count() <= SUMMARY_CHARS
}

fn describe(record: &SourceRecord) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    format!(
        "Original Requester: {}\n\
         Site Path: {}\n\
         OS: {}\n\
         Screen Resolution: {}\n\
         Browser: {}\n\
         Browser Size: {}\n\
         \n\
         {}",
        field(&record.requester_email),
        field(&record.site_path),
        field(&record.os),
        field(&record.resolution),
        field(&record.browser),
        field(&record.browser_size),
        record.description,
    )
}

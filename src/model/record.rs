use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority as BugHerd reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePriority {
    Critical,
    Important,
    Normal,
    /// Anything else, including "minor", "not set" and empty values.
    Other(String),
}

impl SourcePriority {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("critical") {
            SourcePriority::Critical
        } else if value.eq_ignore_ascii_case("important") {
            SourcePriority::Important
        } else if value.eq_ignore_ascii_case("normal") {
            SourcePriority::Normal
        } else {
            SourcePriority::Other(value.to_string())
        }
    }
}

/// Priority names understood by the destination tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JiraPriority {
    Critical,
    Major,
    Minor,
    Trivial,
}

impl JiraPriority {
    #[cfg(test)]
    pub(crate) const ALL: [JiraPriority; 4] = [
        JiraPriority::Critical,
        JiraPriority::Major,
        JiraPriority::Minor,
        JiraPriority::Trivial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JiraPriority::Critical => "Critical",
            JiraPriority::Major => "Major",
            JiraPriority::Minor => "Minor",
            JiraPriority::Trivial => "Trivial",
        }
    }
}

impl From<&SourcePriority> for JiraPriority {
    fn from(priority: &SourcePriority) -> Self {
        match priority {
            SourcePriority::Critical => JiraPriority::Critical,
            SourcePriority::Important => JiraPriority::Major,
            SourcePriority::Normal => JiraPriority::Minor,
            SourcePriority::Other(_) => JiraPriority::Trivial,
        }
    }
}

impl fmt::Display for JiraPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Open,
    Closed,
    Other(String),
}

impl RecordStatus {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("closed") {
            RecordStatus::Closed
        } else if value.eq_ignore_ascii_case("open") {
            RecordStatus::Open
        } else {
            RecordStatus::Other(value.to_string())
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, RecordStatus::Closed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Open => f.write_str("open"),
            RecordStatus::Closed => f.write_str("closed"),
            RecordStatus::Other(s) => f.write_str(s),
        }
    }
}

/// One bug report read from a BugHerd export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// BugHerd task id, or the 1-based position in the export when the
    /// export carries no id.
    pub source_id: String,
    pub priority: SourcePriority,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_size: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub status: RecordStatus,
}

impl SourceRecord {
    /// Explicit attachments first, then the screenshot.
    pub fn attachment_urls(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .map(String::as_str)
            .chain(self.screenshot.as_deref())
            .collect()
    }
}

/// Split a BugHerd tag string into label tokens.
///
/// Tokens are trimmed, inner whitespace becomes `_`, and duplicates keep
/// their first position.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let label = token.trim().replace(char::is_whitespace, "_");
        if !label.is_empty() && !tags.contains(&label) {
            tags.push(label);
        }
    }
    tags
}

pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

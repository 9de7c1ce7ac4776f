//! Reader for BugHerd XML exports.
//!
//! An export is a root element holding `<task>` children, each of which
//! carries its fields as plain text leaves:
//!
//! ```xml
//! <tasks>
//!   <task>
//!     <priority>critical</priority>
//!     <description>Login button is broken</description>
//!     <status>closed</status>
//!     ...
//!   </task>
//! </tasks>
//! ```

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::ParseError;
use crate::model::record::{parse_tags, parse_url_list, RecordStatus, SourcePriority, SourceRecord};

const TASK: &[u8] = b"task";

pub fn read_export(path: &Path) -> Result<Vec<SourceRecord>, ParseError> {
    let xml = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_export(&xml)
}

/// Parse an export held in memory, preserving task order.
pub fn parse_export(xml: &str) -> Result<Vec<SourceRecord>, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut task: Option<HashMap<String, String>> = None;
    let mut field: Option<(String, String)> = None;

    loop {
        let event = reader.read_event().map_err(|e| ParseError::Xml {
            position: reader.error_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                if depth == 2 && e.name().as_ref() == TASK {
                    task = Some(HashMap::new());
                } else if depth == 3 && task.is_some() {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    field = Some((name, String::new()));
                }
            }
            Event::Empty(e) => {
                if depth == 1 && e.name().as_ref() == TASK {
                    records.push(build_record(records.len() + 1, HashMap::new())?);
                } else if depth == 2 {
                    if let Some(fields) = task.as_mut() {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        fields.entry(name).or_default();
                    }
                }
            }
            Event::Text(e) => {
                if let Some((_, text)) = field.as_mut() {
                    if depth == 3 {
                        let unescaped = e.unescape().map_err(|e| ParseError::Xml {
                            position: reader.buffer_position(),
                            message: e.to_string(),
                        })?;
                        text.push_str(&unescaped);
                    }
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = field.as_mut() {
                    if depth == 3 {
                        text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
            }
            Event::End(_) => {
                if depth == 3 {
                    if let (Some(fields), Some((name, text))) = (task.as_mut(), field.take()) {
                        // A repeated element keeps its first occurrence.
                        fields.entry(name).or_insert(text);
                    }
                } else if depth == 2 {
                    if let Some(fields) = task.take() {
                        records.push(build_record(records.len() + 1, fields)?);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if records.is_empty() {
        return Err(ParseError::NoRecords);
    }

    debug!(count = records.len(), "parsed BugHerd export");
    Ok(records)
}

fn build_record(index: usize, fields: HashMap<String, String>) -> Result<SourceRecord, ParseError> {
    let required = |name: &'static str| {
        fields.get(name).ok_or(ParseError::MissingField { index, field: name })
    };
    let optional = |name: &str| {
        fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let description = required("description")?.clone();
    let priority = SourcePriority::parse(required("priority")?);
    let status = RecordStatus::parse(required("status")?);

    let source_id = optional("local-task-id")
        .or_else(|| optional("id"))
        .unwrap_or_else(|| index.to_string());

    Ok(SourceRecord {
        source_id,
        priority,
        description,
        requester_email: optional("requester-email"),
        site_path: optional("path"),
        os: optional("os"),
        resolution: optional("resolution"),
        browser: optional("browser"),
        browser_size: optional("browser-size"),
        tags: optional("tags").map(|t| parse_tags(&t)).unwrap_or_default(),
        comment: optional("comments"),
        attachments: optional("attachments")
            .map(|a| parse_url_list(&a))
            .unwrap_or_default(),
        screenshot: optional("screenshot"),
        status,
    })
}

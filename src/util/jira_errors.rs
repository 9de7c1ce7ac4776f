use serde_json::Value;
use std::collections::BTreeMap;

/// Key used for messages JIRA does not attach to a field.
pub const GENERAL: &str = "_";

/// Collect field-level errors from a JIRA error body.
///
/// JIRA reports validation problems as `{"errorMessages": [...], "errors": {field: message}}`.
/// Bodies that are not JSON objects are kept verbatim under [`GENERAL`].
pub fn extract_field_errors(body: &Value) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    match body {
        Value::Null => {}
        Value::Object(obj) => {
            if let Some(Value::Object(fields)) = obj.get("errors") {
                for (field, message) in fields {
                    errors.insert(field.clone(), value_text(message));
                }
            }
            if let Some(Value::Array(messages)) = obj.get("errorMessages") {
                let joined: Vec<String> = messages.iter().map(value_text).collect();
                if !joined.is_empty() {
                    errors.insert(GENERAL.to_string(), joined.join("; "));
                }
            }
        }
        other => {
            let text = value_text(other);
            if !text.trim().is_empty() {
                errors.insert(GENERAL.to_string(), text);
            }
        }
    }

    errors
}

/// One-line rendering of an error body for logs.
pub fn describe_errors(body: &Value) -> String {
    let errors = extract_field_errors(body);
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

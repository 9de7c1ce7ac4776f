pub mod jira;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::TrackerError;
use crate::model::payload::IssuePayload;
use crate::util::jira_errors::describe_errors;

/// Status and parsed body of one tracker call.
///
/// Non-2xx answers are values, not errors: callers decide per call whether a
/// failure matters.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub async fn from_response(resp: reqwest::Response) -> Result<Self, TrackerError> {
        let status = resp.status();
        let text = resp.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn describe(&self) -> String {
        format!("{} ({})", self.status, describe_errors(&self.body))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateIssueOutcome {
    Created { key: String },
    /// The tracker refused the issue; `errors` maps field to message.
    Rejected {
        status: StatusCode,
        errors: BTreeMap<String, String>,
    },
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, payload: &IssuePayload)
        -> Result<CreateIssueOutcome, TrackerError>;

    /// Comment as `author`, or as the authenticated user when `None`.
    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        author: Option<&str>,
    ) -> Result<ApiResponse, TrackerError>;

    async fn add_attachment(&self, key: &str, file: &Path) -> Result<ApiResponse, TrackerError>;

    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        resolution_id: &str,
    ) -> Result<ApiResponse, TrackerError>;

    async fn delete_issue(&self, key: &str) -> Result<ApiResponse, TrackerError>;
}

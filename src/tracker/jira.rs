use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use super::{ApiResponse, CreateIssueOutcome, IssueTracker};
use crate::config::Credentials;
use crate::error::TrackerError;
use crate::model::payload::{CommentPayload, IssuePayload, NameRef, TransitionPayload};
use crate::util::jira_errors::{describe_errors, extract_field_errors, GENERAL};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the JIRA REST API v2, authenticated with basic auth.
pub struct JiraClient {
    server: String,
    api: String,
    user: String,
    auth_header: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: Option<String>,
}

impl JiraClient {
    pub fn new(server: &str, credentials: &Credentials) -> Result<Self, TrackerError> {
        let server = server.trim_end_matches('/').to_string();
        let creds = format!("{}:{}", credentials.username, credentials.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder()
            .user_agent(concat!("bugherder/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            api: format!("{server}/rest/api/2"),
            server,
            user: credentials.username.clone(),
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    /// Open a session, failing with [`TrackerError::Auth`] if the
    /// credentials are refused.
    pub async fn authenticate(server: &str, credentials: &Credentials) -> Result<Self, TrackerError> {
        let client = Self::new(server, credentials)?;
        let resp = client
            .client
            .get(format!("{}/rest/auth/1/session", client.server))
            .header("Authorization", &client.auth_header)
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = ApiResponse::from_response(resp).await?;
        if !response.is_success() {
            return Err(TrackerError::Auth {
                status: response.status,
                message: describe_errors(&response.body),
            });
        }
        debug!(user = %client.user, "authenticated against {}", client.server);
        Ok(client)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub async fn find_user(&self, username: &str) -> Result<ApiResponse, TrackerError> {
        let url = format!("{}/user?username={}", self.api, urlencoding::encode(username));
        let resp = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await?;
        ApiResponse::from_response(resp).await
    }

    fn issue_url(&self, key: &str, suffix: &str) -> String {
        format!("{}/issue/{}{suffix}", self.api, urlencoding::encode(key))
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<ApiResponse, TrackerError> {
        let resp = self
            .client
            .post(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        ApiResponse::from_response(resp).await
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn create_issue(
        &self,
        payload: &IssuePayload,
    ) -> Result<CreateIssueOutcome, TrackerError> {
        let response = self.post_json(&format!("{}/issue", self.api), payload).await?;

        if !response.is_success() {
            return Ok(CreateIssueOutcome::Rejected {
                status: response.status,
                errors: extract_field_errors(&response.body),
            });
        }

        let created: Option<CreatedIssue> = serde_json::from_value(response.body).ok();
        match created.and_then(|c| c.key) {
            Some(key) => Ok(CreateIssueOutcome::Created { key }),
            None => Ok(CreateIssueOutcome::Rejected {
                status: response.status,
                errors: [(GENERAL.to_string(), "response carried no issue key".to_string())]
                    .into_iter()
                    .collect(),
            }),
        }
    }

    async fn add_comment(
        &self,
        key: &str,
        body: &str,
        author: Option<&str>,
    ) -> Result<ApiResponse, TrackerError> {
        let payload = CommentPayload {
            author: NameRef {
                name: author.unwrap_or(&self.user).to_string(),
            },
            body: body.to_string(),
        };
        self.post_json(&self.issue_url(key, "/comment"), &payload).await
    }

    async fn add_attachment(&self, key: &str, file: &Path) -> Result<ApiResponse, TrackerError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".into());
        let mime = mime_guess::from_path(file).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())?;

        let resp = self
            .client
            .post(self.issue_url(key, "/attachments"))
            .header("Authorization", &self.auth_header)
            .header("X-Atlassian-Token", "nocheck")
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        ApiResponse::from_response(resp).await
    }

    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        resolution_id: &str,
    ) -> Result<ApiResponse, TrackerError> {
        let payload = TransitionPayload::new(transition_id, resolution_id);
        self.post_json(&self.issue_url(key, "/transitions"), &payload).await
    }

    async fn delete_issue(&self, key: &str) -> Result<ApiResponse, TrackerError> {
        let resp = self
            .client
            .delete(self.issue_url(key, ""))
            .header("Authorization", &self.auth_header)
            .send()
            .await?;
        ApiResponse::from_response(resp).await
    }
}

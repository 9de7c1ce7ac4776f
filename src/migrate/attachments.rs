//! Staging of BugHerd attachments before they are re-uploaded.
//!
//! Attachment URLs come straight from the export, so they are checked
//! before anything is fetched: only `http`/`https` is accepted, and when an
//! allow-list is configured the host (and every redirect hop) must be on it.
//! Downloads are idempotent, which makes them the one place a failed request
//! is retried.

use std::path::PathBuf;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::config::MigrationConfig;
use crate::error::DownloadError;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_REDIRECTS: usize = 10;
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const FALLBACK_NAME: &str = "attachment";

pub struct AttachmentStager {
    client: reqwest::Client,
    scratch_dir: PathBuf,
    allowed_hosts: Vec<String>,
    retries: u32,
    backoff: Duration,
}

impl AttachmentStager {
    pub fn new(config: &MigrationConfig) -> Result<Self, reqwest::Error> {
        let allowed_hosts = config.allowed_attachment_hosts.clone();
        let redirect_hosts = allowed_hosts.clone();
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .redirect(Policy::custom(move |attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else if check_url(attempt.url(), &redirect_hosts).is_ok() {
                    attempt.follow()
                } else {
                    attempt.stop()
                }
            }))
            .build()?;

        Ok(Self {
            client,
            scratch_dir: config.scratch_dir.clone(),
            allowed_hosts,
            retries: config.download_retries,
            backoff: Duration::from_millis(500),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn scratch_dir(&self) -> &PathBuf {
        &self.scratch_dir
    }

    /// Download `url` into the scratch directory and return the staged path.
    ///
    /// Only a 200 answer counts. Transport errors and 5xx answers are retried
    /// with capped exponential backoff; anything else fails immediately.
    pub async fn stage(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let parsed = Url::parse(url.trim()).map_err(|e| DownloadError::Rejected {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        check_url(&parsed, &self.allowed_hosts).map_err(|reason| DownloadError::Rejected {
            url: url.to_string(),
            reason,
        })?;

        let bytes = (|| self.fetch(&parsed, url))
            .retry(self.backoff_policy())
            .when(is_transient)
            .notify(|e: &DownloadError, delay: Duration| {
                warn!(%url, ?delay, "download failed, retrying: {e}");
            })
            .await?;

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: self.scratch_dir.display().to_string(),
                source,
            })?;
        let path = self.scratch_dir.join(file_name_for(&parsed));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.display().to_string(),
                source,
            })?;

        debug!(%url, path = %path.display(), size = bytes.len(), "staged attachment");
        Ok(path)
    }

    fn backoff_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.backoff)
            .with_max_delay(MAX_BACKOFF)
            .with_max_times(self.retries as usize)
    }

    async fn fetch(&self, parsed: &Url, url: &str) -> Result<Vec<u8>, DownloadError> {
        let http = |source| DownloadError::Http {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(parsed.clone()).send().await.map_err(http)?;
        if resp.status() != StatusCode::OK {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        resp.bytes().await.map(|b| b.to_vec()).map_err(http)
    }
}

/// 5xx answers and transport failures may clear up; 4xx and rejections won't.
fn is_transient(err: &DownloadError) -> bool {
    match err {
        DownloadError::Status { status, .. } => status.is_server_error(),
        DownloadError::Http { .. } => true,
        DownloadError::Rejected { .. } | DownloadError::Io { .. } => false,
    }
}

fn check_url(url: &Url, allowed_hosts: &[String]) -> Result<(), String> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme {}", url.scheme()));
    }
    let host = url
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| "URL has no host".to_string())?;
    if !allowed_hosts.is_empty() && !allowed_hosts.iter().any(|h| *h == host) {
        return Err(format!("host {host} is not in allowed_attachment_hosts"));
    }
    Ok(())
}

/// Local file name for a download: the last path segment, percent-decoded.
fn file_name_for(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .unwrap_or(FALLBACK_NAME);
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let name = decoded.replace(['/', '\\'], "_");
    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

//! Error types shared across the migration.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures reading a BugHerd export. Always fatal: nothing is migrated.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read export {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("No tasks to create issues from; check that the input XML is a valid BugHerd export")]
    NoRecords,

    #[error("Task #{index} is missing its <{field}> element")]
    MissingField { index: usize, field: &'static str },
}

/// Failures talking to the issue tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Authentication rejected. Fatal to the run.
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures staging one attachment. Only that attachment is skipped.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Refusing to fetch {url}: {reason}")]
    Rejected { url: String, reason: String },

    #[error("Download of {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("Download of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to stage {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

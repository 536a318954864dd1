//! Error types for icsmirror.
//!
//! Ingestion errors (`FetchError`, `DecodeError`) are fatal for a run.
//! `RemoteError` and `PublishError` are recoverable: callers log them and move on.

use thiserror::Error;

/// The remote feed could not be retrieved.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Feed request failed: {0}")]
    Request(String),

    #[error("Feed returned HTTP {status}")]
    Status { status: u16 },
}

/// The fetched feed could not be turned into event records.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Feed is not valid UTF-8")]
    InvalidUtf8,

    #[error("Malformed calendar: {0}")]
    Malformed(String),

    #[error("Event '{uid}' is missing {property}")]
    MissingProperty { uid: String, property: &'static str },

    #[error("Event '{uid}' has an invalid {property}: {reason}")]
    InvalidTime {
        uid: String,
        property: &'static str,
        reason: String,
    },
}

/// A destination calendar rejected a push, or could not be reached.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{cause}")]
pub struct RemoteError {
    cause: String,
}

impl RemoteError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }
}

/// Publishing the rendered feed to version control failed.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to run git {step}: {source}")]
    Spawn {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("git {step} exited with status {status}: {stderr}")]
    Git {
        step: &'static str,
        status: i32,
        stderr: String,
    },

    #[error("Artifact has no parent directory: {0}")]
    NoParent(String),
}

/// Errors that abort an icsmirror operation.
#[derive(Error, Debug)]
pub enum IcsMirrorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for icsmirror operations.
pub type IcsMirrorResult<T> = Result<T, IcsMirrorError>;

//! Error types
//!
//! Every failure a tag-binding operation can surface. All of them are terminal
//! for the current invocation; nothing here is retried.

use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagError {
    /// A required argument was missing or malformed
    #[error("Invalid arguments: {0}")]
    Argument(String),

    /// The service-account key could not be loaded or used
    #[error("Failed to load credentials from {path:?}: {source}")]
    Credential {
        path: PathBuf,
        #[source]
        source: gcp_auth::Error,
    },

    #[error("Failed to get access token: {0}")]
    Token(#[source] gcp_auth::Error),

    /// The API answered with a non-2xx status
    #[error("Request failed with status {status}: {body}")]
    RequestFailure { status: u16, body: String },

    /// The operation finished with an `error` payload
    #[error("Operation {name} failed: {error}")]
    Operation { name: String, error: Value },

    #[error("Operation {name} did not complete within {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TagError {
    /// HTTP status carried by a request failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailure { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TagError>;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::domain::errors::SyncError;
use crate::infrastructure::logging::scrub_secrets;

/// Errors that can occur when talking to the tracker
#[derive(Error, Debug)]
pub enum JiraApiError {
    #[error("Rate limited by tracker")]
    RateLimited { retry_after: Option<Duration> },

    /// Tracker refused the request (4xx other than 429)
    #[error("Tracker rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Tracker server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Could not sign request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl JiraApiError {
    pub fn from_status(status: StatusCode, headers: &HeaderMap, body: &str) -> Self {
        let body = scrub_secrets(body);
        match status.as_u16() {
            429 => Self::RateLimited {
                retry_after: headers
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs),
            },
            500..=599 => Self::ServerError {
                status: status.as_u16(),
                body,
            },
            _ => Self::Rejected {
                status: status.as_u16(),
                body,
            },
        }
    }
}

impl From<JiraApiError> for SyncError {
    fn from(err: JiraApiError) -> Self {
        match err {
            JiraApiError::RateLimited { retry_after } => SyncError::RateLimited { retry_after },
            other => SyncError::UploadFailed(scrub_secrets(&other.to_string())),
        }
    }
}

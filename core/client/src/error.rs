use std::time::Duration;

use monai_cloud_types::{JobStatus, ValidationError};
use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Error type for every call made against the MONAI Cloud API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Unauthorized ({status}): the session token was rejected: {body}")]
    Unauthorized { status: StatusCode, body: String },

    #[error("{method} {url} returned {status}, expected {expected}: {body}")]
    UnexpectedStatus {
        method: Method,
        url: String,
        expected: StatusCode,
        status: StatusCode,
        body: String,
    },

    #[error("Unexpected response body: {0}")]
    UnexpectedBody(String),

    #[error("Job {job_id} finished with status {status}")]
    JobFailed { job_id: String, status: JobStatus },

    #[error("Gave up waiting for job {job_id} after {elapsed:?} (last status: {})", display_status(.last_status))]
    Timeout {
        job_id: String,
        last_status: Option<JobStatus>,
        elapsed: Duration,
    },

    #[error("Stopped waiting for job {job_id}")]
    PollCancelled { job_id: String },

    #[error("Job {job_id} is {status}, results can only be downloaded once it is Done")]
    JobNotDone { job_id: String, status: JobStatus },

    #[error("Dataset {dataset_id} is still referenced by experiments {experiments:?}")]
    DatasetInUse {
        dataset_id: String,
        experiments: Vec<String>,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] ValidationError),

    #[error("Invalid host url: {0}")]
    InvalidHost(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether the failure may go away on its own: connection level errors and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::UnexpectedStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// The HTTP status the server answered with, if the error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { status, .. } | Self::UnexpectedStatus { status, .. } => {
                Some(*status)
            },
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}

fn display_status(status: &Option<JobStatus>) -> String {
    status
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "never observed".to_string())
}

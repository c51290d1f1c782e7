use std::convert::Infallible;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a job as reported by the server.
///
/// The wire value is case-insensitive. Values the client does not know are kept verbatim in
/// [`JobStatus::Unknown`] and count as terminal failures.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
    Unknown(String),
}

impl JobStatus {
    /// Whether the server will not move the job out of this status on its own.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl FromStr for JobStatus {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let status = match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "done" => Self::Done,
            "error" => Self::Error,
            _ => Self::Unknown(value.to_string()),
        };
        Ok(status)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.to_string()
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Running => f.write_str("Running"),
            Self::Done => f.write_str("Done"),
            Self::Error => f.write_str("Error"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// A job as reported by `GET .../jobs/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub action: Option<String>,
    /// Only meaningful once the status is terminal.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub specs: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Payload of `POST .../jobs`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewJob {
    /// What to run, for example `train`, `inference` or `auto3dseg`.
    pub action: String,
    #[serde(default = "empty_specs")]
    pub specs: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<String>,
}

fn empty_specs() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Body returned by job creation: either the bare id or an object carrying it.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CreatedJob {
    Id(String),
    Object { id: String },
}

impl CreatedJob {
    pub fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

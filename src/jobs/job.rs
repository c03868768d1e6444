use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::assets::Asset;
use crate::datetime::rfc1123;

/// Job state as reported by the service.
///
/// Only `Success` and `Failure` are terminal. Values the client does not
/// recognize are kept verbatim in `Unknown` and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum JobState {
    Pending,
    Started,
    Success,
    Failure,
    /// Unrecognized value; an absent or null `state` is `Unknown("")`.
    Unknown(String),
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Unknown(String::new())
    }
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "pending",
            JobState::Started => "started",
            JobState::Success => "success",
            JobState::Failure => "failure",
            JobState::Unknown(raw) => raw,
        }
    }
}

impl From<String> for JobState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => JobState::Pending,
            "started" => JobState::Started,
            "success" => JobState::Success,
            "failure" => JobState::Failure,
            _ => JobState::Unknown(raw),
        }
    }
}

impl From<Option<String>> for JobState {
    fn from(raw: Option<String>) -> Self {
        raw.map(JobState::from).unwrap_or_default()
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of asynchronous remote computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub job_type: String,
    /// Opaque payload interpreted only by the service.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(with = "rfc1123")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub state: JobState,
    /// Output assets; empty until the job succeeds.
    #[serde(default)]
    pub assets: Vec<Asset>,
    /// Result metadata; only populated on success.
    #[serde(default)]
    pub meta: Option<Value>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct JobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    pub parameters: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl JobRequest {
    pub fn new(job_type: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            job_type: job_type.into(),
            parameters,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Body of a submission or status poll response.
///
/// Status polls may report only part of the job, often just `id` and
/// `state`. The remaining fields are kept as raw JSON in `fields` until the
/// run completes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub state: JobState,
    /// Location to poll next.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::job::{Job, JobState, JobStatus};
use crate::api::ApiError;

/// Client-side phases of a job run.
///
/// Each run flows through: SUBMITTING → POLLING → SUCCEEDED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Succeeded | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Submitting => write!(f, "SUBMITTING"),
            RunPhase::Polling => write!(f, "POLLING"),
            RunPhase::Succeeded => write!(f, "SUCCEEDED"),
            RunPhase::Failed => write!(f, "FAILED"),
        }
    }
}

/// What the poll loop does after observing a server response.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Wait, then GET `location`; `attempt` is the 1-based number of that poll.
    Poll { location: String, attempt: u32 },
    /// The service reported a terminal state.
    Complete(Job),
}

/// Polling behaviour for [`JobsEndpoint::run`](super::JobsEndpoint::run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay before the first poll, in milliseconds.
    pub interval_ms: u64,
    /// Multiplier applied to the delay after every poll. 1 keeps it fixed.
    pub backoff_factor: u32,
    /// Upper bound for the delay between polls.
    pub max_interval_ms: u64,
    /// Overall deadline for the run. `None` polls until a terminal state.
    pub timeout_ms: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            backoff_factor: 1,
            max_interval_ms: 30_000,
            timeout_ms: None,
        }
    }
}

impl PollConfig {
    /// Delay before poll `attempt` (1-based).
    /// delay = interval_ms * backoff_factor^(attempt - 1), capped at max_interval_ms
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_factor.max(1)).saturating_pow(attempt.saturating_sub(1));
        let ms = self.interval_ms.saturating_mul(factor).min(self.max_interval_ms.max(self.interval_ms));
        Duration::from_millis(ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Tracks one run of a job from submission to a terminal state.
///
/// The tracker only interprets server responses; it never invents a state.
/// Terminal-ness comes from the reported `state`, not the HTTP status code.
/// Fields from each response are merged over those seen before, so a poll
/// that reports only `state` keeps what the submission reported.
#[derive(Debug, Clone)]
pub struct JobRun {
    phase: RunPhase,
    job_id: Option<String>,
    location: Option<String>,
    record: Map<String, Value>,
    polls: u32,
}

impl Default for JobRun {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRun {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Submitting,
            job_id: None,
            location: None,
            record: Map::new(),
            polls: 0,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Number of status polls issued so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn job_id(&self) -> &str {
        self.job_id.as_deref().unwrap_or_default()
    }

    /// Record that a status poll is about to be sent.
    pub fn record_poll(&mut self) {
        self.polls += 1;
    }

    /// Compute the next transition from a submission or poll response.
    ///
    /// - A terminal state completes the run (`Succeeded` or `Failed`) with
    ///   the merged job record.
    /// - Otherwise the run keeps polling, at the response's `link` when it
    ///   carries one, else at the previous location.
    /// - A non-terminal response with no known location is an error.
    pub fn next(&mut self, response: JobStatus) -> Result<Transition, ApiError> {
        debug_assert!(!self.phase.is_terminal(), "run already finished");
        let JobStatus {
            id,
            state,
            link,
            fields,
        } = response;
        if id.is_some() {
            self.job_id = id;
        }
        self.record.extend(fields);

        let finished = match state {
            JobState::Success => RunPhase::Succeeded,
            JobState::Failure => RunPhase::Failed,
            _ => {
                if link.is_some() {
                    self.location = link;
                }
                let location = self.location.clone().ok_or_else(|| ApiError::MissingPollLocation {
                    job_id: self.job_id().to_string(),
                })?;
                self.phase = RunPhase::Polling;
                return Ok(Transition::Poll {
                    location,
                    attempt: self.polls + 1,
                });
            }
        };

        let job = self.complete(state)?;
        self.phase = finished;
        Ok(Transition::Complete(job))
    }

    fn complete(&mut self, state: JobState) -> Result<Job, ApiError> {
        let mut record = std::mem::take(&mut self.record);
        if let Some(id) = &self.job_id {
            record.insert("id".into(), Value::String(id.clone()));
        }
        record.insert("state".into(), Value::String(state.into()));
        Ok(serde_json::from_value(Value::Object(record))?)
    }
}

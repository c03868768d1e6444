use std::future;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::job::{Job, JobRequest, JobStatus};
use super::lifecycle::{JobRun, PollConfig, Transition};
use crate::api::{ApiError, Client, list_query};

/// Options for a single [`JobsEndpoint::run_with`] call.
///
/// The deadline (`poll.timeout_ms`) and the cancellation token both cover
/// the submit request too. An interrupt that lands before the submission is
/// acknowledged reports an empty `job_id` and zero polls, even though the
/// service may already have created the job.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub poll: PollConfig,
    /// Aborts the run with [`ApiError::Cancelled`] when triggered.
    pub cancel: Option<CancellationToken>,
}

enum Interrupt {
    Cancelled,
    Deadline,
}

#[derive(Serialize)]
struct JobUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// Handle for the jobs endpoint of one project.
pub struct JobsEndpoint<'a> {
    client: &'a Client,
    project_id: &'a str,
    poll: &'a PollConfig,
}

impl<'a> JobsEndpoint<'a> {
    pub fn new(client: &'a Client, project_id: &'a str, poll: &'a PollConfig) -> Self {
        Self {
            client,
            project_id,
            poll,
        }
    }

    fn collection(&self) -> String {
        format!("/projects/{}/jobs", self.project_id)
    }

    fn resource(&self, id: &str) -> String {
        format!("/projects/{}/jobs/{id}", self.project_id)
    }

    /// List jobs. `sort` and `q` are passed to the API verbatim.
    pub async fn list(&self, sort: Option<&str>, q: Option<&str>) -> Result<Vec<Job>, ApiError> {
        let response = self.client.get(&self.collection(), &list_query(sort, q)).await?;
        Client::json(response).await
    }

    /// Fetch a job. The record may be in any state.
    pub async fn get(&self, id: &str) -> Result<Job, ApiError> {
        let response = self.client.get(&self.resource(id), &[]).await?;
        Client::json(response).await
    }

    /// Update a job's mutable fields.
    pub async fn update(&self, id: &str, name: Option<&str>) -> Result<Job, ApiError> {
        let response = self
            .client
            .patch_json(&self.resource(id), &JobUpdate { name })
            .await?;
        Client::json(response).await
    }

    /// Dispatch a job and wait for it to finish.
    ///
    /// Returns the job as last reported by the service. A job that ends in
    /// `failure` is returned as `Ok`; only transport problems are errors.
    /// Polls with the endpoint's [`PollConfig`] and no cancellation.
    pub async fn run(
        &self,
        job_type: &str,
        parameters: Map<String, Value>,
        name: Option<&str>,
    ) -> Result<Job, ApiError> {
        let mut request = JobRequest::new(job_type, parameters);
        request.name = name.map(str::to_string);
        let options = RunOptions {
            poll: self.poll.clone(),
            cancel: None,
        };
        self.run_with(request, options).await
    }

    /// [`run`](Self::run) with explicit polling, deadline and cancellation.
    #[tracing::instrument(skip(self, request, options), fields(job_type = %request.job_type))]
    pub async fn run_with(&self, request: JobRequest, options: RunOptions) -> Result<Job, ApiError> {
        let mut run = JobRun::new();

        let interrupt = {
            let drive = self.drive(&request, &options.poll, &mut run);
            tokio::select! {
                result = drive => return result,
                _ = cancelled(options.cancel.as_ref()) => Interrupt::Cancelled,
                _ = deadline(options.poll.timeout()) => Interrupt::Deadline,
            }
        };

        let job_id = run.job_id().to_string();
        let polls = run.polls();
        warn!(job_id = %job_id, polls, phase = %run.phase(), "job run interrupted");
        Err(match interrupt {
            Interrupt::Cancelled => ApiError::Cancelled { job_id, polls },
            Interrupt::Deadline => ApiError::DeadlineExceeded { job_id, polls },
        })
    }

    async fn drive(&self, request: &JobRequest, poll: &PollConfig, run: &mut JobRun) -> Result<Job, ApiError> {
        let response = self.client.post_json(&self.collection(), request).await?;
        let submitted: JobStatus = Client::json(response).await?;
        info!(
            job_id = submitted.id.as_deref().unwrap_or_default(),
            state = %submitted.state,
            "job submitted"
        );

        let mut transition = run.next(submitted)?;
        loop {
            match transition {
                Transition::Complete(job) => {
                    info!(job_id = %job.id, state = %job.state, polls = run.polls(), "job finished");
                    return Ok(job);
                }
                Transition::Poll { location, attempt } => {
                    sleep(poll.delay_for_attempt(attempt)).await;
                    run.record_poll();
                    let response = self.client.get(&location, &[]).await?;
                    let status = response.status();
                    let polled: JobStatus = Client::json(response).await?;
                    debug!(
                        job_id = run.job_id(),
                        attempt,
                        status = status.as_u16(),
                        state = %polled.state,
                        "job polled"
                    );
                    transition = run.next(polled)?;
                }
            }
        }
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => future::pending().await,
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => sleep(timeout).await,
        None => future::pending().await,
    }
}

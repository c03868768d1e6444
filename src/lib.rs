//! Async client for the Metafold REST API.
//!
//! [`MetafoldClient`] is bound to one project and exposes two endpoints:
//! [`assets`](MetafoldClient::assets) for stored files and
//! [`jobs`](MetafoldClient::jobs) for asynchronous compute jobs. Running a
//! job submits it and polls the status link the service hands back until the
//! job succeeds or fails:
//!
//! ```no_run
//! # async fn example() -> Result<(), metafold::ApiError> {
//! use metafold::{JobState, MetafoldClient};
//! use serde_json::json;
//!
//! let client = MetafoldClient::new("secret-key", "123")?;
//! let params = json!({"graph": {"operators": [], "edges": []}});
//! let job = client
//!     .jobs()
//!     .run("evaluate_metrics", params.as_object().cloned().unwrap_or_default(), None)
//!     .await?;
//! if job.state == JobState::Success {
//!     println!("{:?}", job.meta);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod assets;
pub mod config;
pub mod datetime;
pub mod jobs;

use std::time::Duration;

pub use api::{ApiError, Client};
pub use assets::{Asset, AssetsEndpoint};
pub use config::MetafoldConfig;
pub use jobs::{Job, JobRequest, JobState, JobsEndpoint, PollConfig, RunOptions};

/// Metafold API client for one project.
///
/// Cheap to clone; clones share the underlying connection pool, so one
/// client can drive many concurrent job runs.
#[derive(Debug, Clone)]
pub struct MetafoldClient {
    client: Client,
    project_id: String,
    poll: PollConfig,
}

impl MetafoldClient {
    pub fn new(access_token: &str, project_id: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(access_token, project_id, api::DEFAULT_BASE_URL)
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        access_token: &str,
        project_id: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: Client::with_base_url(access_token, base_url)?,
            project_id: project_id.into(),
            poll: PollConfig::default(),
        })
    }

    pub fn from_config(config: &MetafoldConfig) -> Result<Self, ApiError> {
        let client = Client::with_base_url(&config.access_token, &config.base_url)?
            .with_request_timeout(Duration::from_secs(config.request_timeout_secs));
        Ok(Self {
            client,
            project_id: config.project_id.clone(),
            poll: config.poll.clone(),
        })
    }

    /// Polling behaviour used by [`JobsEndpoint::run`].
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn assets(&self) -> AssetsEndpoint<'_> {
        AssetsEndpoint::new(&self.client, &self.project_id)
    }

    pub fn jobs(&self) -> JobsEndpoint<'_> {
        JobsEndpoint::new(&self.client, &self.project_id, &self.poll)
    }
}

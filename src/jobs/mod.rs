mod endpoint;
mod job;
mod lifecycle;

pub use endpoint::{JobsEndpoint, RunOptions};
pub use job::{Job, JobRequest, JobState, JobStatus};
pub use lifecycle::{JobRun, PollConfig, RunPhase, Transition};

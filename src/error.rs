use thiserror::Error;
use tokio::task::JoinError;

/// A scenario that cannot be run as submitted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("scenario needs at least one concurrent user")]
    NoUsers,
    #[error("scenario has no requests")]
    NoRequests,
    #[error("request #{index}: unsupported method `{method}` (expected GET, POST, PUT or DELETE)")]
    UnsupportedMethod { index: usize, method: String },
    #[error("request #{index}: url is empty")]
    EmptyUrl { index: usize },
}

/// Failure of the engine itself, as opposed to a failed request.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("result collector task failed: {0}")]
    Collector(#[from] JoinError),
}

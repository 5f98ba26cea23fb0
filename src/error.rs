//! Error types for the mech agent

use thiserror::Error;

/// Errors surfaced by the remote model transport.
///
/// The rate limiter absorbs `Throttled` and `ServerFault` by retrying;
/// everything else propagates to the caller.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The service asked us to slow down (HTTP 429 / RESOURCE_EXHAUSTED).
    #[error("model throttled: {0}")]
    Throttled(String),

    /// A transient server-side fault (HTTP 5xx).
    #[error("model server fault: {0}")]
    ServerFault(String),

    #[error("model request rejected: {0}")]
    Rejected(String),

    #[error("malformed model response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Errors raised by tool handlers. The orchestration loop never inspects
/// these beyond "the tool produced no value".
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Error, Debug)]
pub enum Error {
    /// A startup-time problem: missing credential, missing goal/prompt,
    /// or an invalid tool registration. Fatal to the run.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

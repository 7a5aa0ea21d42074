//! Error types for jobwatch
//!
//! This module provides the error taxonomy of the execution engine:
//! - Submission failures (transport or schema rejection at job creation)
//! - Watch failures (the status subscription ended before a terminal status)
//! - Per-artifact fetch and decode failures (recovered locally by the engine)
//! - Deadline and cancellation outcomes for a tracked execution

use std::time::Duration;
use thiserror::Error;

/// Result type alias for jobwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for jobwatch
///
/// Submission and watch failures abort the `run` of the item they belong to.
/// Artifact failures are isolated per artifact and normally never reach the caller
/// through this type; they are logged and excluded from the output bundle instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "orchestrator.api_server")
        key: Option<String>,
    },

    /// The orchestrator rejected the execution request or could not be reached
    #[error("submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// The status subscription failed before a terminal status was observed
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),

    /// A single artifact could not be retrieved or decoded
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The execution did not reach a terminal status before the deadline
    #[error("execution {execution} did not complete within {after:?}")]
    Timeout {
        /// Name of the execution that timed out
        execution: String,
        /// The deadline that elapsed
        after: Duration,
    },

    /// Waiting for the execution was cancelled by the caller
    #[error("waiting for execution {execution} was cancelled")]
    Cancelled {
        /// Name of the execution whose watch was cancelled
        execution: String,
    },

    /// Object storage operation failed while staging inputs
    #[error("object storage error: {0}")]
    Storage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status code attached to the originating error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Submission(e) => e.status_code,
            Error::Fetch(FetchError::Status { status_code, .. }) => Some(*status_code),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Failure to create an execution on the orchestrator
///
/// Carries the remote status code and response body verbatim so that a failed run can be
/// debugged against the orchestrator without re-issuing the request.
#[derive(Debug, Clone, Error)]
#[error("{message} (status: {}, body: {})", fmt_status(.status_code), .body.as_deref().unwrap_or("<none>"))]
pub struct SubmissionError {
    /// Human-readable description of the failure
    pub message: String,
    /// HTTP status returned by the orchestrator (None for transport failures)
    pub status_code: Option<u16>,
    /// Raw response body returned by the orchestrator
    pub body: Option<String>,
}

impl SubmissionError {
    /// Create a submission error from a rejected response
    pub fn rejected(message: impl Into<String>, status_code: u16, body: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
            body: Some(body.into()),
        }
    }

    /// Create a submission error for a request that was never sent
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            body: None,
        }
    }

    /// Create a submission error from a transport failure
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            message: format!("failed to send execution request: {}", err),
            status_code: err.status().map(|s| s.as_u16()),
            body: None,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "<none>".to_string(), |s| s.to_string())
}

/// Failure of the live status subscription before a terminal status was seen
#[derive(Debug, Clone, Error)]
pub enum WatchError {
    /// The subscription could not be opened
    #[error("failed to open status subscription for {execution}: {reason}")]
    SubscribeFailed {
        /// Name of the watched execution
        execution: String,
        /// The reason the subscription could not be opened
        reason: String,
    },

    /// The event stream failed mid-flight (reset, malformed frame, transport error)
    #[error("status stream for {execution} failed: {reason}")]
    StreamFailed {
        /// Name of the watched execution
        execution: String,
        /// The reason the stream failed
        reason: String,
    },

    /// The orchestrator sent an error frame on the watch stream
    #[error("orchestrator reported a watch error for {execution}: {message}")]
    ErrorEvent {
        /// Name of the watched execution
        execution: String,
        /// Message carried by the error frame
        message: String,
    },

    /// The watched object was deleted before reaching a terminal status
    #[error("execution {execution} was deleted before completing")]
    Deleted {
        /// Name of the watched execution
        execution: String,
    },

    /// The stream ended without ever reporting a terminal status
    #[error("status stream for {execution} ended after {events} event(s) without a terminal status")]
    EndedEarly {
        /// Name of the watched execution
        execution: String,
        /// Number of events observed before the stream ended
        events: usize,
    },
}

/// Failure to retrieve or decode one artifact
#[derive(Debug, Error)]
pub enum FetchError {
    /// Artifact URL could not be built from the configured template
    #[error("invalid artifact URL for {artifact}: {reason}")]
    InvalidUrl {
        /// Artifact name
        artifact: String,
        /// The reason the URL is invalid
        reason: String,
    },

    /// Transport failure while requesting the artifact
    #[error("request for artifact {artifact} failed: {source}")]
    Request {
        /// Artifact name
        artifact: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The artifact endpoint answered with a non-success status
    #[error("artifact {artifact} returned status {status_code}: {body}")]
    Status {
        /// Artifact name
        artifact: String,
        /// HTTP status code
        status_code: u16,
        /// Raw response body
        body: String,
    },

    /// The artifact payload could not be decoded
    #[error("artifact {artifact} could not be decoded: {source}")]
    Decode {
        /// Artifact name
        artifact: String,
        /// Underlying decode failure
        #[source]
        source: DecodeError,
    },
}

impl FetchError {
    /// Name of the artifact this error belongs to
    pub fn artifact(&self) -> &str {
        match self {
            FetchError::InvalidUrl { artifact, .. }
            | FetchError::Request { artifact, .. }
            | FetchError::Status { artifact, .. }
            | FetchError::Decode { artifact, .. } => artifact,
        }
    }
}

/// Failure to decompress an archive-encoded payload
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The gzip stream or the tar entries inside it are corrupt
    #[error("corrupt archive: {0}")]
    Corrupt(#[from] std::io::Error),

    /// The blocking decode task did not finish
    #[error("decode task failed: {0}")]
    TaskFailed(String),
}

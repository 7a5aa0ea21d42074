//! # jobwatch
//!
//! Client-side engine that drives jobs on a remote workflow orchestrator to completion.
//!
//! One `run` submits an execution request, watches the orchestrator's live status stream
//! until the execution reaches a terminal status, normalizes the reported output
//! parameters and fetches every output artifact (typing it by name and headers, and
//! unpacking `.tgz` payloads to text).
//!
//! ## Quick Start
//!
//! ```no_run
//! use jobwatch::{Config, ExecutionEngine, ExecutionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("jobwatch.json")?;
//!     let engine = ExecutionEngine::new(config)?;
//!
//!     // Abort pending watches on Ctrl+C / SIGTERM
//!     tokio::spawn(jobwatch::cancel_on_shutdown_signal(engine.cancel_token()));
//!
//!     let bundle = engine
//!         .run(ExecutionRequest::new("WORKFLOW_TEMPLATE.topics.create").parameter("x", 1))
//!         .await?;
//!
//!     for (name, parameter) in &bundle.parameters {
//!         println!("{} = {}", name, parameter.value);
//!     }
//!     for artifact in &bundle.artifacts {
//!         println!("{} ({}): {}", artifact.file_name, artifact.mime_type, artifact.text());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Authentication headers
pub mod auth;
/// Configuration types
pub mod config;
/// MIME type and extension inference
pub mod content_type;
/// Execution engine (submit, watch, harvest)
pub mod engine;
/// Error types
pub mod error;
/// Archive decoding
pub mod extraction;
/// Artifact retrieval
pub mod fetch;
/// Output parameter normalization
pub mod outputs;
/// Retry logic with exponential backoff
pub mod retry;
/// Input staging in object storage
pub mod staging;
/// Execution submission transports
pub mod submit;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Completion watching
pub mod watch;

// Re-export commonly used types
pub use auth::{AuthContext, Credentials};
pub use config::{Config, SubmitMode};
pub use engine::ExecutionEngine;
pub use error::{DecodeError, Error, FetchError, Result, SubmissionError, WatchError};
pub use staging::{MemoryObjectStore, ObjectStore};
pub use submit::{AnonymousSubmitter, CustomResourceSubmitter, Submitter};
pub use types::{
    ArtifactDescriptor, ArtifactSource, Completion, Event, ExecutionHandle, ExecutionRequest,
    ExecutionStatus, OutputBundle, Parameter, ResolvedArtifact, ResourceKind,
};
pub use watch::{CompletionWatcher, KubeWatchSource, StatusSource, WatchEvent, WatchEventType};

/// Cancel `token` when the process receives a termination signal.
///
/// Pass the engine's [`cancel_token`](ExecutionEngine::cancel_token) to turn SIGINT or
/// SIGTERM into [`Error::Cancelled`] for every pending `run`.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use jobwatch::{Config, ExecutionEngine, cancel_on_shutdown_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = ExecutionEngine::new(Config::default())?;
///     tokio::spawn(cancel_on_shutdown_signal(engine.cancel_token()));
///     Ok(())
/// }
/// ```
pub async fn cancel_on_shutdown_signal(token: tokio_util::sync::CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => token.cancel(),
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

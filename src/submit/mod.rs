//! Execution submission
//!
//! The orchestrator accepts executions over two transports:
//!
//! - [`CustomResourceSubmitter`]: creates a namespaced `Execution` custom resource on the
//!   API server and watches that resource.
//! - [`AnonymousSubmitter`]: posts a single-step workflow to the execution API. No
//!   `Execution` object is persisted, so the returned handle points at the workflow.
//!
//! Both implement [`Submitter`]. A submission is attempted exactly once; rejections and
//! transport failures come back as [`SubmissionError`] carrying the remote status code and
//! response body.

mod anonymous;
mod custom_resource;
pub mod wire;

pub use anonymous::AnonymousSubmitter;
pub use custom_resource::CustomResourceSubmitter;

use crate::auth::AuthContext;
use crate::error::SubmissionError;
use crate::types::{ArtifactSource, ExecutionHandle, ExecutionRequest};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use wire::SubmissionBody;

/// Creates executions on the orchestrator
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit a request and return the handle the orchestrator assigned
    async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionHandle, SubmissionError>;

    /// Name of the transport (for logging)
    fn name(&self) -> &'static str;
}

/// Reject requests that the orchestrator would reject anyway
pub(crate) fn validate_request(request: &ExecutionRequest) -> Result<(), SubmissionError> {
    if request.task_id.trim().is_empty() {
        return Err(SubmissionError::invalid("task id must not be empty"));
    }
    if let Some(name) = request.duplicate_parameter() {
        return Err(SubmissionError::invalid(format!(
            "parameter {:?} is given more than once",
            name
        )));
    }
    for artifact in &request.artifacts {
        if let ArtifactSource::Inline(bytes) = &artifact.source
            && std::str::from_utf8(bytes).is_err()
        {
            return Err(SubmissionError::invalid(format!(
                "inline artifact {:?} is not valid UTF-8 text",
                artifact.name
            )));
        }
    }
    Ok(())
}

/// POST a body and decode the JSON answer
///
/// Non-2xx answers and undecodable bodies keep the status and raw body.
pub(crate) async fn post_body<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: url::Url,
    auth: &AuthContext,
    timeout: Duration,
    body: &SubmissionBody,
) -> Result<T, SubmissionError> {
    let request = http
        .post(url.clone())
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout)
        .json(body);

    let response = auth
        .apply(request)
        .send()
        .await
        .map_err(|e| SubmissionError::transport(&e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SubmissionError::transport(&e))?;

    if !status.is_success() {
        tracing::warn!(%url, status = status.as_u16(), "orchestrator rejected execution");
        return Err(SubmissionError::rejected(
            "orchestrator rejected execution",
            status.as_u16(),
            text,
        ));
    }

    serde_json::from_str(&text).map_err(|e| {
        SubmissionError::rejected(
            format!("unexpected create response: {}", e),
            status.as_u16(),
            text.clone(),
        )
    })
}

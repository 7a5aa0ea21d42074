//! Artifact retrieval
//!
//! Output artifacts are fetched from the artifact server with an authenticated GET against
//! a URL templated from the execution's UID, its resource name and the artifact name.
//! Each response is typed by [`content_type::resolve`](crate::content_type::resolve) and,
//! when it carries the archive extension, decoded to text.
//!
//! Failures are per artifact: [`ArtifactFetcher::fetch_all`] logs and skips an artifact
//! that cannot be retrieved and keeps going with the rest.

use crate::auth::{AuthContext, Credentials};
use crate::config::{ArtifactConfig, RetryConfig};
use crate::content_type::{self, ARCHIVE_EXTENSION};
use crate::error::FetchError;
use crate::extraction::decode_archive;
use crate::retry::fetch_with_retry;
use crate::types::{
    ArtifactDescriptor, ArtifactSource, Completion, Event, ResolvedArtifact, ResourceKind,
};
use crate::utils::{extension_of, filename_from_content_disposition, join_url, render_template};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use tokio::sync::broadcast;

/// Raw artifact response
struct Fetched {
    content_type: Option<String>,
    content_disposition: Option<String>,
    bytes: Vec<u8>,
}

/// Retrieves and materializes output artifacts
#[derive(Clone)]
pub struct ArtifactFetcher {
    http: reqwest::Client,
    auth: AuthContext,
    config: ArtifactConfig,
    retry: RetryConfig,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl ArtifactFetcher {
    /// Create a fetcher authenticating with HTTP Basic credentials, if given
    pub fn new(
        http: reqwest::Client,
        config: ArtifactConfig,
        retry: RetryConfig,
        credentials: Option<&Credentials>,
    ) -> Self {
        Self {
            http,
            auth: AuthContext::basic(credentials),
            config,
            retry,
            event_tx: None,
        }
    }

    /// Publish artifact events on the given channel
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// URL of an artifact produced by a completed execution
    pub fn artifact_url(
        &self,
        completion: &Completion,
        artifact: &str,
    ) -> Result<url::Url, FetchError> {
        let template = match completion.handle.kind {
            ResourceKind::Workflow => &self.config.workflow_template,
            ResourceKind::Execution => &self.config.execution_template,
        };

        let uid = completion.uid();
        if uid.is_none() && template.contains("{uid}") {
            return Err(FetchError::InvalidUrl {
                artifact: artifact.to_string(),
                reason: format!("execution {} has no uid", completion.handle),
            });
        }

        let path = render_template(
            template,
            &[
                ("uid", uid.unwrap_or_default()),
                ("name", completion.name()),
                ("artifact", artifact),
            ],
        );
        join_url(&self.config.base_url, &path).map_err(|e| FetchError::InvalidUrl {
            artifact: artifact.to_string(),
            reason: e.to_string(),
        })
    }

    /// Retrieve one artifact
    ///
    /// Inline artifacts are materialized from their embedded content without a request.
    pub async fn fetch(
        &self,
        completion: &Completion,
        artifact: &ArtifactDescriptor,
    ) -> Result<ResolvedArtifact, FetchError> {
        let fetched = match &artifact.source {
            ArtifactSource::Inline(bytes) => Fetched {
                content_type: None,
                content_disposition: None,
                bytes: bytes.clone(),
            },
            ArtifactSource::Reference(_) => {
                let url = self.artifact_url(completion, &artifact.name)?;
                tracing::debug!(execution = %completion.handle, artifact = %artifact.name, %url, "requesting artifact");
                self.get(url, &artifact.name).await?
            }
        };

        materialize(&artifact.name, fetched).await
    }

    /// Retrieve every artifact, skipping the ones that fail
    ///
    /// The result keeps the input order of the artifacts that were resolved.
    pub async fn fetch_all(
        &self,
        completion: &Completion,
        artifacts: &[ArtifactDescriptor],
    ) -> Vec<ResolvedArtifact> {
        let mut resolved = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            match self.fetch(completion, artifact).await {
                Ok(item) => {
                    tracing::debug!(
                        execution = %completion.handle,
                        artifact = %item.name,
                        mime_type = %item.mime_type,
                        size = item.bytes.len(),
                        "artifact resolved"
                    );
                    self.emit(Event::ArtifactResolved {
                        execution: completion.handle.clone(),
                        artifact: item.name.clone(),
                        mime_type: item.mime_type.clone(),
                        size: item.bytes.len() as u64,
                    });
                    resolved.push(item);
                }
                Err(e) => {
                    tracing::warn!(
                        execution = %completion.handle,
                        artifact = %artifact.name,
                        error = %e,
                        "skipping artifact that could not be resolved"
                    );
                    self.emit(Event::ArtifactFailed {
                        execution: completion.handle.clone(),
                        artifact: artifact.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        resolved
    }

    async fn get(&self, url: url::Url, artifact: &str) -> Result<Fetched, FetchError> {
        fetch_with_retry(&self.retry, || {
            let url = url.clone();
            async move {
                let request = self.http.get(url).timeout(self.config.timeout);
                let response = self.auth.apply(request).send().await.map_err(|source| {
                    FetchError::Request {
                        artifact: artifact.to_string(),
                        source,
                    }
                })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(FetchError::Status {
                        artifact: artifact.to_string(),
                        status_code: status.as_u16(),
                        body,
                    });
                }

                let header = |name: HeaderName| {
                    response
                        .headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                let content_type = header(CONTENT_TYPE);
                let content_disposition = header(CONTENT_DISPOSITION);

                let bytes = response.bytes().await.map_err(|source| FetchError::Request {
                    artifact: artifact.to_string(),
                    source,
                })?;

                Ok(Fetched {
                    content_type,
                    content_disposition,
                    bytes: bytes.to_vec(),
                })
            }
        })
        .await
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            tx.send(event).ok();
        }
    }
}

async fn materialize(name: &str, fetched: Fetched) -> Result<ResolvedArtifact, FetchError> {
    let resolved = content_type::resolve(name, fetched.content_type.as_deref());
    let disposition_name = fetched
        .content_disposition
        .as_deref()
        .and_then(filename_from_content_disposition);

    let extension = disposition_name
        .as_deref()
        .and_then(extension_of)
        .or_else(|| resolved.extension.map(str::to_string));

    let file_name = disposition_name.clone().unwrap_or_else(|| match resolved.extension {
        Some(ext) => format!("{}.{}", name, ext),
        None => name.to_string(),
    });

    let archive = match disposition_name.as_deref().and_then(extension_of) {
        Some(ext) => ext == ARCHIVE_EXTENSION,
        None => content_type::is_archive(name),
    };

    let text_if_decoded = if archive {
        let text = decode_archive(fetched.bytes.clone())
            .await
            .map_err(|source| FetchError::Decode {
                artifact: name.to_string(),
                source,
            })?;
        Some(text)
    } else {
        None
    };

    Ok(ResolvedArtifact {
        name: name.to_string(),
        mime_type: resolved.mime_type,
        extension,
        file_name,
        bytes: fetched.bytes,
        text_if_decoded,
    })
}

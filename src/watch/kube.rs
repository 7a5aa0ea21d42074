//! Watch source backed by the orchestrator API server's watch endpoint
//!
//! `GET <collection>?watch=true&fieldSelector=metadata.name=<name>` answers with a
//! long-lived response carrying one JSON `{type, object}` frame per line.

use super::{StatusSource, WatchEvent, WatchStream};
use crate::auth::AuthContext;
use crate::config::Config;
use crate::error::WatchError;
use crate::types::{ExecutionHandle, ResourceKind};
use crate::utils::join_url;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

/// Longest watch frame accepted before the stream is failed (16 MiB)
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug)]
struct Collection {
    group: String,
    version: String,
    plural: String,
}

impl Collection {
    fn path(&self, namespace: &str) -> String {
        format!(
            "/apis/{}/{}/namespaces/{}/{}",
            self.group, self.version, namespace, self.plural
        )
    }
}

/// Watches `Execution` and workflow resources on the API server
#[derive(Clone, Debug)]
pub struct KubeWatchSource {
    http: reqwest::Client,
    api_server: String,
    namespace: String,
    auth: AuthContext,
    executions: Collection,
    workflows: Collection,
    max_frame_length: usize,
}

impl KubeWatchSource {
    /// Create a source for the collections named in the configuration
    ///
    /// `http` must not carry a client-wide timeout: a watch stays open until the execution
    /// finishes.
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        let orchestrator = &config.orchestrator;
        let anonymous = &config.anonymous;
        Self {
            http,
            api_server: orchestrator.api_server.clone(),
            namespace: orchestrator.namespace.clone(),
            auth: AuthContext::bearer(orchestrator.token.as_deref()),
            executions: Collection {
                group: orchestrator.group.clone(),
                version: orchestrator.version.clone(),
                plural: orchestrator.plural.clone(),
            },
            workflows: Collection {
                group: anonymous.workflow_group.clone(),
                version: anonymous.workflow_version.clone(),
                plural: anonymous.workflow_plural.clone(),
            },
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }

    /// Fail the watch on any frame longer than `bytes`
    pub fn with_max_frame_length(mut self, bytes: usize) -> Self {
        self.max_frame_length = bytes;
        self
    }

    /// Collection URL watched for a resource kind
    pub fn collection_url(&self, kind: ResourceKind) -> Result<url::Url, url::ParseError> {
        let collection = match kind {
            ResourceKind::Execution => &self.executions,
            ResourceKind::Workflow => &self.workflows,
        };
        join_url(&self.api_server, &collection.path(&self.namespace))
    }
}

#[async_trait]
impl StatusSource for KubeWatchSource {
    async fn subscribe(&self, handle: &ExecutionHandle) -> Result<WatchStream, WatchError> {
        let subscribe_failed = |reason: String| WatchError::SubscribeFailed {
            execution: handle.name.clone(),
            reason,
        };

        let url = self
            .collection_url(handle.kind)
            .map_err(|e| subscribe_failed(format!("invalid API server URL: {}", e)))?;
        let selector = format!("metadata.name={}", handle.name);

        let request = self
            .http
            .get(url)
            .query(&[("watch", "true"), ("fieldSelector", selector.as_str())]);
        let response = self
            .auth
            .apply(request)
            .send()
            .await
            .map_err(|e| subscribe_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(subscribe_failed(format!("status {}: {}", status.as_u16(), body)));
        }

        let execution = handle.name.clone();
        let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
        let codec = LinesCodec::new_with_max_length(self.max_frame_length);
        let frames = FramedRead::new(reader, codec).filter_map(move |line| {
            let execution = execution.clone();
            async move {
                match line {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => Some(serde_json::from_str::<WatchEvent>(&line).map_err(|e| {
                        WatchError::StreamFailed {
                            execution,
                            reason: format!("malformed watch frame: {}", e),
                        }
                    })),
                    Err(e) => Some(Err(WatchError::StreamFailed {
                        execution,
                        reason: e.to_string(),
                    })),
                }
            }
        });

        Ok(frames.boxed())
    }
}

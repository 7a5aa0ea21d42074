//! Submission by creating an `Execution` custom resource

use super::wire::{CreatedObject, ExecutionObject, ExecutionSpec, ObjectMeta, SubmissionBody};
use super::{Submitter, post_body, validate_request};
use crate::auth::AuthContext;
use crate::config::OrchestratorConfig;
use crate::error::SubmissionError;
use crate::types::{ExecutionHandle, ExecutionRequest, ResourceKind};
use crate::utils::join_url;
use async_trait::async_trait;

/// Creates `Execution` objects through the orchestrator API server
pub struct CustomResourceSubmitter {
    http: reqwest::Client,
    config: OrchestratorConfig,
    auth: AuthContext,
}

impl CustomResourceSubmitter {
    /// Create a submitter; authenticates with the configured bearer token, if any
    pub fn new(http: reqwest::Client, config: OrchestratorConfig) -> Self {
        let auth = AuthContext::bearer(config.token.as_deref());
        Self { http, config, auth }
    }

    /// Collection URL the resource is created in
    pub fn collection_url(&self) -> Result<url::Url, SubmissionError> {
        let path = format!(
            "/apis/{}/{}/namespaces/{}/{}",
            self.config.group, self.config.version, self.config.namespace, self.config.plural
        );
        join_url(&self.config.api_server, &path)
            .map_err(|e| SubmissionError::invalid(format!("invalid API server URL: {}", e)))
    }

    /// Build the `Execution` object for a request
    pub fn body(&self, request: &ExecutionRequest) -> SubmissionBody {
        SubmissionBody::CustomResource(ExecutionObject {
            api_version: self.config.api_version(),
            kind: "Execution".to_string(),
            metadata: ObjectMeta {
                generate_name: Some(self.config.generate_name.clone()),
                ..Default::default()
            },
            spec: ExecutionSpec {
                task: request.task_id.clone(),
                arguments: request.arguments(),
                ignore_schema_validation: self.config.ignore_schema_validation,
                active_deadline_seconds: request.deadline_seconds,
                extra: request.extra.clone(),
            },
        })
    }
}

#[async_trait]
impl Submitter for CustomResourceSubmitter {
    async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionHandle, SubmissionError> {
        validate_request(request)?;
        let url = self.collection_url()?;

        tracing::debug!(%url, task = %request.task_id, "creating execution resource");

        let created: CreatedObject = post_body(
            &self.http,
            url,
            &self.auth,
            self.config.timeout,
            &self.body(request),
        )
        .await?;

        let name = created.metadata.name.ok_or_else(|| {
            SubmissionError::invalid("created execution has no metadata.name")
        })?;

        tracing::info!(execution = %name, task = %request.task_id, "execution created");

        Ok(ExecutionHandle::new(
            name,
            created.metadata.uid,
            ResourceKind::Execution,
        ))
    }

    fn name(&self) -> &'static str {
        "custom_resource"
    }
}

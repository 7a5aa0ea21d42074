//! Submission through the anonymous execution endpoint

use super::wire::{
    AnonymousCreated, AnonymousExecution, AnonymousOutputs, Step, SubmissionBody,
    step_artifact_ref,
};
use super::{Submitter, post_body, validate_request};
use crate::auth::{AuthContext, Credentials};
use crate::config::AnonymousConfig;
use crate::error::SubmissionError;
use crate::types::{Arguments, ArtifactDescriptor, ExecutionHandle, ExecutionRequest, ResourceKind};
use crate::utils::{join_url, render_template};
use async_trait::async_trait;

const RETRY_POLICY: &str = "DEFAULT";

/// Runs a task as a single-step workflow without persisting an `Execution`
pub struct AnonymousSubmitter {
    http: reqwest::Client,
    config: AnonymousConfig,
    auth: AuthContext,
}

impl AnonymousSubmitter {
    /// Create a submitter authenticating with HTTP Basic credentials
    pub fn new(
        http: reqwest::Client,
        config: AnonymousConfig,
        credentials: Option<&Credentials>,
    ) -> Self {
        Self {
            http,
            config,
            auth: AuthContext::basic(credentials),
        }
    }

    /// Endpoint the workflow is posted to
    pub fn endpoint(&self) -> Result<url::Url, SubmissionError> {
        let path = render_template(
            "/workspace/{workspace}/anonymous/execution",
            &[("workspace", self.config.workspace.as_str())],
        );
        join_url(&self.config.base_url, &path)
            .map_err(|e| SubmissionError::invalid(format!("invalid execution API URL: {}", e)))
    }

    /// Build the single-step workflow for a request
    ///
    /// The request's inputs become the step's arguments; each declared output artifact is
    /// forwarded from the step to the workflow outputs. `deadline_seconds` is not sent.
    pub fn body(&self, request: &ExecutionRequest) -> SubmissionBody {
        let step = self.config.execution_name.clone();
        let forwarded = request
            .output_artifacts
            .iter()
            .map(|name| ArtifactDescriptor::reference(name.clone(), step_artifact_ref(&step, name)))
            .collect();

        SubmissionBody::Anonymous(AnonymousExecution {
            workspace: self.config.workspace.clone(),
            name: step.clone(),
            description: String::new(),
            git_repo: String::new(),
            retry_config: RETRY_POLICY.to_string(),
            inputs: Arguments::default(),
            outputs: AnonymousOutputs {
                artifacts: forwarded,
            },
            steps: vec![vec![Step {
                name: step,
                task: request.task_id.clone(),
                arguments: request.arguments(),
            }]],
            extra: request.extra.clone(),
        })
    }
}

#[async_trait]
impl Submitter for AnonymousSubmitter {
    async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionHandle, SubmissionError> {
        validate_request(request)?;
        let url = self.endpoint()?;

        tracing::debug!(%url, task = %request.task_id, "posting anonymous execution");

        let created: AnonymousCreated = post_body(
            &self.http,
            url,
            &self.auth,
            self.config.timeout,
            &self.body(request),
        )
        .await?;

        tracing::info!(
            execution = %created.id,
            workflow_uid = ?created.workflow_uid,
            task = %request.task_id,
            "anonymous execution created"
        );

        Ok(ExecutionHandle::new(
            created.id,
            created.workflow_uid,
            ResourceKind::Workflow,
        ))
    }

    fn name(&self) -> &'static str {
        "anonymous"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> AnonymousConfig {
        AnonymousConfig {
            base_url,
            workspace: "marshall".into(),
            execution_name: "gpt-chat".into(),
            ..Default::default()
        }
    }

    #[test]
    fn body_wraps_task_in_a_single_step() {
        let submitter = AnonymousSubmitter::new(
            reqwest::Client::new(),
            config("http://localhost:8080".into()),
            None,
        );
        let request = ExecutionRequest::new("WORKFLOW_TEMPLATE.quid-questions.main-askquid[ask]")
            .parameter("prompt", "what changed?")
            .output_artifact("answer-markdown")
            .deadline_seconds(600);

        let json = serde_json::to_value(submitter.body(&request)).unwrap();

        assert_eq!(json["workspace"], "marshall");
        assert_eq!(json["name"], "gpt-chat");
        assert_eq!(json["gitRepo"], "");
        assert_eq!(json["retryConfig"], "DEFAULT");
        assert!(json.get("activeDeadlineSeconds").is_none());
        assert_eq!(json["inputs"], json!({"parameters": [], "artifacts": []}));
        assert_eq!(
            json["outputs"]["artifacts"],
            json!([{
                "name": "answer-markdown",
                "from": "{{ steps.gpt-chat.outputs.artifacts.answer-markdown }}"
            }])
        );
        assert_eq!(json["steps"][0][0]["name"], "gpt-chat");
        assert_eq!(
            json["steps"][0][0]["task"],
            "WORKFLOW_TEMPLATE.quid-questions.main-askquid[ask]"
        );
        assert_eq!(
            json["steps"][0][0]["arguments"]["parameters"],
            json!([{"name": "prompt", "value": "what changed?"}])
        );
    }

    #[tokio::test]
    async fn submit_returns_workflow_handle() {
        let server = MockServer::start().await;
        let creds = Credentials::new("user", "pass");
        Mock::given(method("POST"))
            .and(path("/workspace/marshall/anonymous/execution"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .and(body_partial_json(json!({"retryConfig": "DEFAULT"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "gpt-chat-x7k2p", "workflowUid": "wf-uid"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let submitter =
            AnonymousSubmitter::new(reqwest::Client::new(), config(server.uri()), Some(&creds));
        let handle = submitter
            .submit(&ExecutionRequest::new("t1"))
            .await
            .unwrap();

        assert_eq!(handle.name, "gpt-chat-x7k2p");
        assert_eq!(handle.uid.as_deref(), Some("wf-uid"));
        assert_eq!(handle.kind, ResourceKind::Workflow);
    }

    #[tokio::test]
    async fn unauthorized_response_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/workspace/marshall/anonymous/execution"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let err = AnonymousSubmitter::new(reqwest::Client::new(), config(server.uri()), None)
            .submit(&ExecutionRequest::new("t1"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code, Some(401));
        assert_eq!(err.body.as_deref(), Some("bad credentials"));
    }

    #[tokio::test]
    async fn non_json_success_body_is_rejected_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/workspace/marshall/anonymous/execution"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = AnonymousSubmitter::new(reqwest::Client::new(), config(server.uri()), None)
            .submit(&ExecutionRequest::new("t1"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code, Some(200));
        assert!(err.message.contains("unexpected create response"));
        assert_eq!(err.body.as_deref(), Some("<html>login</html>"));
    }
}

//! Request and response bodies of the two submission transports

use crate::types::{Arguments, ArtifactDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a create call, one variant per transport
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubmissionBody {
    /// `Execution` custom resource
    CustomResource(ExecutionObject),
    /// Single-step anonymous workflow
    Anonymous(AnonymousExecution),
}

/// Object metadata as used by the orchestrator API server
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Prefix for a server-generated name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    /// Namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Server-assigned UID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// `Execution` custom resource
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionObject {
    /// `<group>/<version>`
    pub api_version: String,
    /// Always `Execution`
    pub kind: String,
    /// Metadata; only `generateName` is set on create
    pub metadata: ObjectMeta,
    /// Execution spec
    pub spec: ExecutionSpec,
}

/// Spec of an `Execution` resource
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSpec {
    /// Task identifier
    pub task: String,
    /// Input parameters and artifacts
    pub arguments: Arguments,
    /// Skip argument schema validation on the orchestrator
    pub ignore_schema_validation: bool,
    /// Orchestrator-side hard timeout
    pub active_deadline_seconds: u64,
    /// Pass-through fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Created-object body returned by the API server
#[derive(Clone, Debug, Deserialize)]
pub struct CreatedObject {
    /// Metadata of the created resource
    #[serde(default)]
    pub metadata: ObjectMeta,
}

/// Anonymous execution: a workflow with one step running the task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousExecution {
    /// Workspace the execution runs in
    pub workspace: String,
    /// Workflow name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Git repository backing the workflow (empty for anonymous executions)
    pub git_repo: String,
    /// Retry policy name
    pub retry_config: String,
    /// Workflow-level inputs
    pub inputs: Arguments,
    /// Workflow-level outputs forwarded from the step
    pub outputs: AnonymousOutputs,
    /// Step groups; groups run in order, steps in a group run in parallel
    pub steps: Vec<Vec<Step>>,
    /// Pass-through fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outputs block of an anonymous execution
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnonymousOutputs {
    /// Forwarded artifacts (`from` references into the step outputs)
    #[serde(default)]
    pub artifacts: Vec<ArtifactDescriptor>,
}

/// One workflow step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step name
    pub name: String,
    /// Task identifier
    pub task: String,
    /// Step arguments
    pub arguments: Arguments,
}

/// Response of the anonymous execution endpoint
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousCreated {
    /// Name of the workflow running the execution
    pub id: String,
    /// UID of that workflow
    #[serde(default)]
    pub workflow_uid: Option<String>,
}

/// `from` expression forwarding a step output artifact
pub fn step_artifact_ref(step: &str, artifact: &str) -> String {
    format!("{{{{ steps.{}.outputs.artifacts.{} }}}}", step, artifact)
}

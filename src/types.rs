//! Core types for jobwatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// Default orchestrator-side deadline for an execution, in seconds
pub const DEFAULT_DEADLINE_SECONDS: u64 = 7200;

/// A named scalar or structured value passed to or produced by a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name (unique within one parameter list)
    pub name: String,
    /// Parameter value (any JSON value)
    #[serde(default)]
    pub value: Value,
}

impl Parameter {
    /// Create a new parameter
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Where an artifact's content lives
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Content embedded in the request or status payload
    Inline(Vec<u8>),
    /// Pointer to content held by the orchestrator or object store
    Reference(String),
}

/// A named artifact that is either inline content or a reference, never both
///
/// On the wire an inline artifact is `{"name": .., "raw": {"data": ..}}` and a reference is
/// `{"name": .., "from": ..}`. Output artifacts reported by the orchestrator usually carry
/// neither and instead describe their storage location (for example `s3.key`); those are
/// read as references to that key, or to their own name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArtifactWire", into = "ArtifactWire")]
pub struct ArtifactDescriptor {
    /// Artifact name
    pub name: String,
    /// Artifact content or locator
    pub source: ArtifactSource,
    /// Fields the engine does not interpret, kept for forward compatibility
    pub extra: Map<String, Value>,
}

impl ArtifactDescriptor {
    /// Create an inline artifact
    ///
    /// Inline content travels as text in `raw.data`; submitting non-UTF-8 bytes is rejected.
    pub fn inline(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: ArtifactSource::Inline(data.into()),
            extra: Map::new(),
        }
    }

    /// Create a referenced artifact
    pub fn reference(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ArtifactSource::Reference(locator.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawData {
    data: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ArtifactWire {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw: Option<RawData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<ArtifactWire> for ArtifactDescriptor {
    type Error = String;

    fn try_from(wire: ArtifactWire) -> Result<Self, Self::Error> {
        let source = match (wire.raw, wire.from) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "artifact {} has both raw content and a from reference",
                    wire.name
                ));
            }
            (Some(raw), None) => ArtifactSource::Inline(raw.data.into_bytes()),
            (None, Some(from)) => ArtifactSource::Reference(from),
            (None, None) => {
                let key = wire
                    .extra
                    .get("s3")
                    .and_then(|s3| s3.get("key"))
                    .or_else(|| wire.extra.get("key"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                ArtifactSource::Reference(key.unwrap_or_else(|| wire.name.clone()))
            }
        };

        Ok(Self {
            name: wire.name,
            source,
            extra: wire.extra,
        })
    }
}

impl From<ArtifactDescriptor> for ArtifactWire {
    fn from(artifact: ArtifactDescriptor) -> Self {
        let (raw, from) = match artifact.source {
            ArtifactSource::Inline(bytes) => (
                Some(RawData {
                    data: String::from_utf8_lossy(&bytes).into_owned(),
                }),
                None,
            ),
            ArtifactSource::Reference(locator) => (None, Some(locator)),
        };
        Self {
            name: artifact.name,
            raw,
            from,
            extra: artifact.extra,
        }
    }
}

/// Arguments block shared by both submission transports
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    /// Input parameters in submission order
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Input artifacts
    #[serde(default)]
    pub artifacts: Vec<ArtifactDescriptor>,
}

/// Description of one job to run on the orchestrator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Task (or workflow template) identifier
    pub task_id: String,

    /// Input parameters in submission order
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Input artifacts
    #[serde(default)]
    pub artifacts: Vec<ArtifactDescriptor>,

    /// Orchestrator-side hard timeout (not enforced by the engine)
    ///
    /// Only sent in custom-resource mode; the anonymous execution API has no such field.
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,

    /// Output artifacts the anonymous workflow should forward from its step
    #[serde(default)]
    pub output_artifacts: Vec<String>,

    /// Fields passed through to the orchestrator untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_deadline_seconds() -> u64 {
    DEFAULT_DEADLINE_SECONDS
}

impl ExecutionRequest {
    /// Create a request for the given task with no inputs
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            parameters: Vec::new(),
            artifacts: Vec::new(),
            deadline_seconds: DEFAULT_DEADLINE_SECONDS,
            output_artifacts: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Add an input parameter
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(Parameter::new(name, value));
        self
    }

    /// Add an input artifact
    pub fn artifact(mut self, artifact: ArtifactDescriptor) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Declare an output artifact to forward (anonymous mode)
    pub fn output_artifact(mut self, name: impl Into<String>) -> Self {
        self.output_artifacts.push(name.into());
        self
    }

    /// Set the orchestrator-side deadline (custom-resource mode only)
    pub fn deadline_seconds(mut self, seconds: u64) -> Self {
        self.deadline_seconds = seconds;
        self
    }

    /// Arguments block for the wire request
    pub fn arguments(&self) -> Arguments {
        Arguments {
            parameters: self.parameters.clone(),
            artifacts: self.artifacts.clone(),
        }
    }

    /// Name of the first parameter that appears more than once, if any
    pub fn duplicate_parameter(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.parameters
            .iter()
            .find(|p| !seen.insert(p.name.as_str()))
            .map(|p| p.name.as_str())
    }
}

/// Which orchestrator resource tracks an execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A persisted `Execution` custom resource
    Execution,
    /// A workflow run directly by the orchestrator (anonymous executions)
    Workflow,
}

/// Identifier the orchestrator assigned to a submitted execution
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionHandle {
    /// Generated resource name
    pub name: String,
    /// Resource UID, when the orchestrator reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Resource kind to watch
    pub kind: ResourceKind,
}

impl ExecutionHandle {
    /// Create a handle for a resource
    pub fn new(name: impl Into<String>, uid: Option<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            uid,
            kind,
        }
    }
}

impl std::fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Execution status as reported by the status stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Accepted but not started
    Pending,
    /// Running
    Running,
    /// Finished successfully (terminal)
    Succeeded,
    /// Finished with a task failure (terminal)
    Failed,
    /// Finished with an orchestrator error (terminal)
    Error,
}

impl ExecutionStatus {
    /// Whether no further transitions are expected after this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::Error
        )
    }

    /// Map a reported phase string; unknown phases are treated as still running
    pub fn from_phase(phase: &str) -> Self {
        match phase {
            "" | "Pending" => ExecutionStatus::Pending,
            "Succeeded" => ExecutionStatus::Succeeded,
            "Failed" => ExecutionStatus::Failed,
            "Error" => ExecutionStatus::Error,
            _ => ExecutionStatus::Running,
        }
    }

    /// Classify an observed resource object
    ///
    /// `status.phase` wins when present. Execution objects without a phase are terminal once
    /// their `Completed` condition reports `"true"`; the condition's reason distinguishes
    /// `Failed` and `Error` from success.
    pub fn classify(kind: ResourceKind, object: &Value) -> Self {
        let status = object.get("status");

        if let Some(phase) = status.and_then(|s| s.get("phase")).and_then(Value::as_str) {
            return Self::from_phase(phase);
        }

        if kind == ResourceKind::Execution
            && let Some(completed) = status
                .and_then(|s| s.get("conditions"))
                .and_then(Value::as_array)
                .and_then(|conditions| {
                    conditions
                        .iter()
                        .find(|c| c.get("type").and_then(Value::as_str) == Some("Completed"))
                })
            && completed
                .get("status")
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case("true"))
        {
            return match completed.get("reason").and_then(Value::as_str) {
                Some("Failed") => ExecutionStatus::Failed,
                Some("Error") => ExecutionStatus::Error,
                _ => ExecutionStatus::Succeeded,
            };
        }

        match status {
            Some(Value::Object(map)) if !map.is_empty() => ExecutionStatus::Running,
            _ => ExecutionStatus::Pending,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "Pending",
            ExecutionStatus::Running => "Running",
            ExecutionStatus::Succeeded => "Succeeded",
            ExecutionStatus::Failed => "Failed",
            ExecutionStatus::Error => "Error",
        };
        f.write_str(s)
    }
}

/// The terminal observation of one execution
///
/// Holds the full resource object from the terminal event; outputs are extracted from it.
#[derive(Clone, Debug)]
pub struct Completion {
    /// Handle of the completed execution
    pub handle: ExecutionHandle,
    /// Terminal status
    pub status: ExecutionStatus,
    /// Resource object carried by the terminal event
    pub object: Value,
    /// Number of events observed on the subscription, including the terminal one
    pub events_observed: usize,
}

impl Completion {
    /// Resource name from the terminal object, falling back to the handle
    pub fn name(&self) -> &str {
        self.object
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or(&self.handle.name)
    }

    /// Resource UID from the terminal object, falling back to the handle
    pub fn uid(&self) -> Option<&str> {
        self.object
            .get("metadata")
            .and_then(|m| m.get("uid"))
            .and_then(Value::as_str)
            .or(self.handle.uid.as_deref())
    }

    /// The outputs block of the terminal object
    ///
    /// Workflows report outputs on their root node (`status.nodes[<name>].outputs`);
    /// execution objects report them at `status.outputs`.
    pub fn outputs(&self) -> Option<&Value> {
        let status = self.object.get("status")?;
        match self.handle.kind {
            ResourceKind::Workflow => status.get("nodes")?.get(self.name())?.get("outputs"),
            ResourceKind::Execution => status.get("outputs"),
        }
    }

    /// Output parameters in reported order
    pub fn output_parameters(&self) -> Vec<Parameter> {
        self.outputs()
            .and_then(|o| o.get("parameters"))
            .map(crate::outputs::parameters_from_value)
            .unwrap_or_default()
    }

    /// Output artifacts in reported order
    pub fn output_artifacts(&self) -> Vec<ArtifactDescriptor> {
        let Some(items) = self
            .outputs()
            .and_then(|o| o.get("artifacts"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(
                |item| match serde_json::from_value::<ArtifactDescriptor>(item.clone()) {
                    Ok(artifact) => Some(artifact),
                    Err(e) => {
                        tracing::warn!(execution = %self.handle, error = %e, "skipping malformed output artifact");
                        None
                    }
                },
            )
            .collect()
    }
}

/// An artifact retrieved and decoded for the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Artifact name
    pub name: String,
    /// Resolved MIME type
    pub mime_type: String,
    /// File extension (without the dot), when one is known
    pub extension: Option<String>,
    /// File name to present the content under
    pub file_name: String,
    /// Raw content as retrieved
    pub bytes: Vec<u8>,
    /// Text extracted from an archive payload
    pub text_if_decoded: Option<String>,
}

impl ResolvedArtifact {
    /// Text view of the artifact: the decoded archive text, or the raw bytes read as UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        match &self.text_if_decoded {
            Some(text) => Cow::Borrowed(text.as_str()),
            None => String::from_utf8_lossy(&self.bytes),
        }
    }
}

/// Everything a completed execution produced
#[derive(Clone, Debug)]
pub struct OutputBundle {
    /// The execution the outputs belong to
    pub execution: ExecutionHandle,
    /// Terminal status the outputs were harvested at
    pub status: ExecutionStatus,
    /// Output parameters keyed by name
    pub parameters: HashMap<String, Parameter>,
    /// Artifacts that were resolved successfully, in reported order
    pub artifacts: Vec<ResolvedArtifact>,
}

impl OutputBundle {
    /// Whether the execution finished successfully
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Succeeded
    }

    /// Look up a resolved artifact by name
    pub fn artifact(&self, name: &str) -> Option<&ResolvedArtifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }
}

/// Event emitted while tracking executions
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An input was uploaded to object storage ahead of submission
    InputStaged {
        /// Object key
        key: String,
        /// Uploaded size in bytes
        size: u64,
    },

    /// Execution accepted by the orchestrator
    Submitted {
        /// Handle of the new execution
        execution: ExecutionHandle,
        /// Task identifier
        task_id: String,
    },

    /// A status update was observed on the subscription
    StatusObserved {
        /// Handle of the watched execution
        execution: ExecutionHandle,
        /// Classified status
        status: ExecutionStatus,
        /// Time the update was observed
        observed_at: DateTime<Utc>,
    },

    /// Terminal status reached
    Completed {
        /// Handle of the completed execution
        execution: ExecutionHandle,
        /// Terminal status
        status: ExecutionStatus,
    },

    /// An output artifact was resolved
    ArtifactResolved {
        /// Handle of the execution
        execution: ExecutionHandle,
        /// Artifact name
        artifact: String,
        /// Resolved MIME type
        mime_type: String,
        /// Size in bytes
        size: u64,
    },

    /// An output artifact could not be resolved and was left out of the bundle
    ArtifactFailed {
        /// Handle of the execution
        execution: ExecutionHandle,
        /// Artifact name
        artifact: String,
        /// Error message
        error: String,
    },

    /// The watch deadline elapsed
    TimedOut {
        /// Handle of the execution
        execution: ExecutionHandle,
    },

    /// The watch was cancelled
    Cancelled {
        /// Handle of the execution
        execution: ExecutionHandle,
    },
}

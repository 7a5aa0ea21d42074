//! Configuration types for jobwatch

use crate::auth::Credentials;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which transport is used to create executions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Create a namespaced `Execution` custom resource directly (default)
    #[default]
    CustomResource,
    /// POST an ephemeral "anonymous" execution to the execution API
    Anonymous,
}

/// Orchestrator API (custom-resource) settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Base URL of the orchestrator API server
    #[serde(default = "default_api_server")]
    pub api_server: String,

    /// Bearer token for the API server (None = unauthenticated)
    #[serde(default)]
    pub token: Option<String>,

    /// Custom resource API group (default: "netbasequid.canalflow")
    #[serde(default = "default_group")]
    pub group: String,

    /// Custom resource API version (default: "v1")
    #[serde(default = "default_version")]
    pub version: String,

    /// Namespace executions are created and watched in (default: "canal-flow")
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Plural resource name (default: "executions")
    #[serde(default = "default_plural")]
    pub plural: String,

    /// Prefix the orchestrator uses to generate execution names
    #[serde(default = "default_generate_name")]
    pub generate_name: String,

    /// Ask the orchestrator to skip argument schema validation
    #[serde(default)]
    pub ignore_schema_validation: bool,

    /// Timeout for the create call (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            api_server: default_api_server(),
            token: None,
            group: default_group(),
            version: default_version(),
            namespace: default_namespace(),
            plural: default_plural(),
            generate_name: default_generate_name(),
            ignore_schema_validation: false,
            timeout: default_request_timeout(),
        }
    }
}

impl OrchestratorConfig {
    /// `apiVersion` string of the execution custom resource
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// Anonymous execution API settings
///
/// Anonymous executions do not persist an `Execution` object; the orchestrator runs a
/// workflow directly, so the watch targets the workflow collection instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnonymousConfig {
    /// Base URL of the execution API
    #[serde(default = "default_execution_api")]
    pub base_url: String,

    /// Workspace the anonymous execution runs in
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Name given to the single-step workflow wrapping the task
    #[serde(default = "default_anonymous_name")]
    pub execution_name: String,

    /// Workflow resource API group (default: "argoproj.io")
    #[serde(default = "default_workflow_group")]
    pub workflow_group: String,

    /// Workflow resource API version (default: "v1alpha1")
    #[serde(default = "default_workflow_version")]
    pub workflow_version: String,

    /// Workflow plural resource name (default: "workflows")
    #[serde(default = "default_workflow_plural")]
    pub workflow_plural: String,

    /// Timeout for the create call (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for AnonymousConfig {
    fn default() -> Self {
        Self {
            base_url: default_execution_api(),
            workspace: default_workspace(),
            execution_name: default_anonymous_name(),
            workflow_group: default_workflow_group(),
            workflow_version: default_workflow_version(),
            workflow_plural: default_workflow_plural(),
            timeout: default_request_timeout(),
        }
    }
}

/// Artifact retrieval settings
///
/// URL templates are appended to `base_url` and may reference `{uid}`, `{name}` and
/// `{artifact}`; each placeholder is percent-encoded as a single path segment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Base URL of the artifact server
    #[serde(default = "default_artifact_base")]
    pub base_url: String,

    /// Template for artifacts produced by workflows (anonymous mode)
    #[serde(default = "default_workflow_template")]
    pub workflow_template: String,

    /// Template for artifacts produced by execution objects (custom-resource mode)
    #[serde(default = "default_execution_template")]
    pub execution_template: String,

    /// Timeout for each artifact request (default: 60 seconds)
    #[serde(default = "default_artifact_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            base_url: default_artifact_base(),
            workflow_template: default_workflow_template(),
            execution_template: default_execution_template(),
            timeout: default_artifact_timeout(),
        }
    }
}

/// Completion watch settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchConfig {
    /// How long to wait for a terminal status before giving up (default: 2 hours)
    #[serde(default = "default_watch_deadline", with = "duration_serde")]
    pub deadline: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            deadline: default_watch_deadline(),
        }
    }
}

/// Retry configuration for transient artifact retrieval failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for [`ExecutionEngine`](crate::ExecutionEngine)
///
/// Every section has defaults, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Submission transport
    #[serde(default)]
    pub mode: SubmitMode,

    /// Custom-resource orchestrator settings (also used for watching)
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Anonymous execution API settings
    #[serde(default)]
    pub anonymous: AnonymousConfig,

    /// Artifact retrieval settings
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Completion watch settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Retry settings for artifact retrieval
    #[serde(default)]
    pub retry: RetryConfig,

    /// Basic-auth credentials for the execution and artifact APIs
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Config {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Check that URLs parse and that required names are present
    pub fn validate(&self) -> Result<()> {
        check_url("orchestrator.api_server", &self.orchestrator.api_server)?;
        check_url("anonymous.base_url", &self.anonymous.base_url)?;
        check_url("artifacts.base_url", &self.artifacts.base_url)?;

        if self.orchestrator.namespace.trim().is_empty() {
            return Err(Error::Config {
                message: "namespace must not be empty".to_string(),
                key: Some("orchestrator.namespace".to_string()),
            });
        }

        if self.watch.deadline.is_zero() {
            return Err(Error::Config {
                message: "watch deadline must be greater than zero".to_string(),
                key: Some("watch.deadline".to_string()),
            });
        }

        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::Config {
                message: format!("backoff multiplier must be finite and >= 1.0, got {multiplier}"),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }

        Ok(())
    }
}

fn check_url(key: &str, value: &str) -> Result<()> {
    url::Url::parse(value).map(|_| ()).map_err(|e| Error::Config {
        message: format!("invalid URL {:?}: {}", value, e),
        key: Some(key.to_string()),
    })
}

fn default_api_server() -> String {
    "https://kubernetes.default.svc".to_string()
}

fn default_group() -> String {
    "netbasequid.canalflow".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_namespace() -> String {
    "canal-flow".to_string()
}

fn default_plural() -> String {
    "executions".to_string()
}

fn default_generate_name() -> String {
    "jobwatch-".to_string()
}

fn default_execution_api() -> String {
    "http://localhost:8080".to_string()
}

fn default_workspace() -> String {
    "default".to_string()
}

fn default_anonymous_name() -> String {
    "anonymous-execution".to_string()
}

fn default_workflow_group() -> String {
    "argoproj.io".to_string()
}

fn default_workflow_version() -> String {
    "v1alpha1".to_string()
}

fn default_workflow_plural() -> String {
    "workflows".to_string()
}

fn default_artifact_base() -> String {
    "http://localhost:8080".to_string()
}

fn default_workflow_template() -> String {
    "/artifacts-by-uid/{uid}/{name}/{artifact}".to_string()
}

fn default_execution_template() -> String {
    "/execution/{uid}/artifact/{artifact}".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_artifact_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_watch_deadline() -> Duration {
    Duration::from_secs(7200) // matches the orchestrator-side activeDeadlineSeconds default
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

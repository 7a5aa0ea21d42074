//! Execution engine
//!
//! [`ExecutionEngine`] composes the pieces of one tracked execution:
//! - `run` - submit, wait for the terminal status, harvest outputs
//! - [`staging`](crate::staging) - optional upload of inputs before submission
//!
//! Collaborators (submitter, status source, object store) are injected at construction;
//! the engine holds no process-wide state.

mod run;


use crate::config::{Config, SubmitMode};
use crate::error::{Error, Result};
use crate::fetch::ArtifactFetcher;
use crate::staging::{InputStager, ObjectStore};
use crate::submit::{AnonymousSubmitter, CustomResourceSubmitter, Submitter};
use crate::types::{ArtifactDescriptor, Event};
use crate::watch::{CompletionWatcher, KubeWatchSource, StatusSource};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel; slow subscribers miss the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Drives executions from submission to harvested outputs (cloneable, all fields shared)
#[derive(Clone)]
pub struct ExecutionEngine {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Submission transport
    pub(crate) submitter: Arc<dyn Submitter>,
    /// Completion watcher over the configured status source
    pub(crate) watcher: CompletionWatcher,
    /// Artifact retrieval
    pub(crate) fetcher: ArtifactFetcher,
    /// Input staging, when an object store is attached
    pub(crate) stager: Option<InputStager>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cancels pending watches when triggered
    pub(crate) shutdown: CancellationToken,
}

impl ExecutionEngine {
    /// Create an engine talking to the orchestrator described by `config`
    ///
    /// The submission transport follows `config.mode`; status is watched on the
    /// orchestrator API server.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let http = http_client()?;

        let submitter: Arc<dyn Submitter> = match config.mode {
            SubmitMode::CustomResource => Arc::new(CustomResourceSubmitter::new(
                http.clone(),
                config.orchestrator.clone(),
            )),
            SubmitMode::Anonymous => Arc::new(AnonymousSubmitter::new(
                http.clone(),
                config.anonymous.clone(),
                config.credentials.as_ref(),
            )),
        };
        let source = Arc::new(KubeWatchSource::new(http.clone(), &config));

        tracing::info!(
            mode = submitter.name(),
            api_server = %config.orchestrator.api_server,
            namespace = %config.orchestrator.namespace,
            "execution engine ready"
        );

        Ok(Self::assemble(config, http, submitter, source))
    }

    /// Create an engine from explicit collaborators
    ///
    /// Artifacts are still fetched according to `config.artifacts`.
    pub fn with_components(
        config: Config,
        submitter: Arc<dyn Submitter>,
        source: Arc<dyn StatusSource>,
    ) -> Result<Self> {
        let http = http_client()?;
        Ok(Self::assemble(config, http, submitter, source))
    }

    fn assemble(
        config: Config,
        http: reqwest::Client,
        submitter: Arc<dyn Submitter>,
        source: Arc<dyn StatusSource>,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let watcher = CompletionWatcher::new(source).with_events(event_tx.clone());
        let fetcher = ArtifactFetcher::new(
            http,
            config.artifacts.clone(),
            config.retry.clone(),
            config.credentials.as_ref(),
        )
        .with_events(event_tx.clone());

        Self {
            config: Arc::new(config),
            submitter,
            watcher,
            fetcher,
            stager: None,
            event_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach an object store for [`stage_input`](Self::stage_input)
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.stager = Some(InputStager::new(store).with_events(self.event_tx.clone()));
        self
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that aborts pending watches when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Abort pending watches; later runs fail with [`Error::Cancelled`]
    pub fn shutdown(&self) {
        tracing::info!("execution engine shutting down");
        self.shutdown.cancel();
    }

    /// Upload an input to the attached object store and reference it by key
    pub async fn stage_input(
        &self,
        name: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<ArtifactDescriptor> {
        let stager = self.stager.as_ref().ok_or_else(|| Error::Config {
            message: "no object store attached".to_string(),
            key: None,
        })?;
        stager.stage(name, key, bytes).await
    }
}

// No client-wide timeout: watch responses stay open until the execution finishes.
fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("jobwatch/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

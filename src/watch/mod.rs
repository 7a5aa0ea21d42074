//! Completion watching
//!
//! A [`StatusSource`] opens a live, name-filtered subscription to the resource backing an
//! execution. [`CompletionWatcher`] consumes that subscription in a background task and
//! resolves a one-shot channel exactly once: with the first terminal observation, or with
//! the [`WatchError`] that ended the subscription. The subscription is dropped (closed) as
//! soon as that happens.
//!
//! The caller side races the one-shot against a deadline and a [`CancellationToken`], so a
//! stuck execution or a hung stream never blocks forever. Dropping the `watch` future also
//! aborts the background task.

mod kube;

pub use kube::{DEFAULT_MAX_FRAME_LENGTH, KubeWatchSource};

use crate::error::{Error, Result, WatchError};
use crate::types::{Completion, Event, ExecutionHandle, ExecutionStatus};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

/// Kind of change reported by a watch frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    /// Object appeared (also sent for the current state when the watch opens)
    Added,
    /// Object changed
    Modified,
    /// Object was deleted
    Deleted,
    /// Progress marker without object changes
    Bookmark,
    /// Server-side watch error; the object is a status describing it
    Error,
}

/// One `(eventType, object)` frame of a watch stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Change kind
    #[serde(rename = "type")]
    pub event_type: WatchEventType,
    /// Resource object (or error status for `ERROR` frames)
    #[serde(default)]
    pub object: Value,
}

impl WatchEvent {
    /// Create a frame
    pub fn new(event_type: WatchEventType, object: Value) -> Self {
        Self { event_type, object }
    }
}

/// Stream of watch frames; dropping it closes the subscription
pub type WatchStream = BoxStream<'static, std::result::Result<WatchEvent, WatchError>>;

/// Opens live status subscriptions
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Subscribe to changes of the resource behind `handle`
    async fn subscribe(
        &self,
        handle: &ExecutionHandle,
    ) -> std::result::Result<WatchStream, WatchError>;
}

/// Waits for executions to reach a terminal status
#[derive(Clone)]
pub struct CompletionWatcher {
    source: Arc<dyn StatusSource>,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl CompletionWatcher {
    /// Create a watcher over a status source
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self {
            source,
            event_tx: None,
        }
    }

    /// Publish status events on the given channel
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Wait for the execution to reach a terminal status
    ///
    /// Returns the terminal [`Completion`], a [`WatchError`] if the subscription ends
    /// first, [`Error::Timeout`] once `deadline` elapses, or [`Error::Cancelled`] when
    /// `cancel` fires. In the last two cases the subscription is closed before returning.
    pub async fn watch(
        &self,
        handle: &ExecutionHandle,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let (done_tx, done_rx) = oneshot::channel();

        let source = self.source.clone();
        let event_tx = self.event_tx.clone();
        let observed = handle.clone();
        // Dropping the watch future aborts the observer and closes the subscription.
        let observer = AbortOnDropHandle::new(tokio::spawn(async move {
            let outcome = observe(source, &observed, event_tx).await;
            // The subscription has been dropped by now; the receiver may be gone too.
            let _ = done_tx.send(outcome);
        }));

        tokio::select! {
            outcome = done_rx => match outcome {
                Ok(Ok(completion)) => {
                    tracing::info!(
                        execution = %handle,
                        status = %completion.status,
                        events = completion.events_observed,
                        "execution reached terminal status"
                    );
                    self.emit(Event::Completed {
                        execution: handle.clone(),
                        status: completion.status,
                    });
                    Ok(completion)
                }
                Ok(Err(e)) => {
                    tracing::warn!(execution = %handle, error = %e, "status watch failed");
                    Err(Error::Watch(e))
                }
                Err(_) => Err(Error::Watch(WatchError::StreamFailed {
                    execution: handle.name.clone(),
                    reason: "watch task ended without reporting".to_string(),
                })),
            },
            _ = tokio::time::sleep(deadline) => {
                observer.abort();
                tracing::warn!(execution = %handle, deadline_secs = deadline.as_secs(), "watch deadline elapsed");
                self.emit(Event::TimedOut { execution: handle.clone() });
                Err(Error::Timeout {
                    execution: handle.name.clone(),
                    after: deadline,
                })
            }
            _ = cancel.cancelled() => {
                observer.abort();
                tracing::info!(execution = %handle, "watch cancelled");
                self.emit(Event::Cancelled { execution: handle.clone() });
                Err(Error::Cancelled {
                    execution: handle.name.clone(),
                })
            }
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            tx.send(event).ok();
        }
    }
}

async fn observe(
    source: Arc<dyn StatusSource>,
    handle: &ExecutionHandle,
    event_tx: Option<broadcast::Sender<Event>>,
) -> std::result::Result<Completion, WatchError> {
    let mut stream = source.subscribe(handle).await?;
    tracing::debug!(execution = %handle, kind = ?handle.kind, "status subscription open");

    let mut events = 0usize;
    while let Some(frame) = stream.next().await {
        let frame = frame?;

        match frame.event_type {
            WatchEventType::Bookmark => continue,
            WatchEventType::Error => {
                let message = frame
                    .object
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| frame.object.to_string());
                return Err(WatchError::ErrorEvent {
                    execution: handle.name.clone(),
                    message,
                });
            }
            WatchEventType::Deleted => {
                return Err(WatchError::Deleted {
                    execution: handle.name.clone(),
                });
            }
            WatchEventType::Added | WatchEventType::Modified => {}
        }

        if let Some(name) = frame
            .object
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            && name != handle.name
        {
            continue;
        }

        events += 1;
        let status = ExecutionStatus::classify(handle.kind, &frame.object);
        tracing::debug!(execution = %handle, %status, events, "status observed");

        if let Some(tx) = &event_tx {
            tx.send(Event::StatusObserved {
                execution: handle.clone(),
                status,
                observed_at: chrono::Utc::now(),
            })
            .ok();
        }

        if status.is_terminal() {
            return Ok(Completion {
                handle: handle.clone(),
                status,
                object: frame.object,
                events_observed: events,
            });
        }
    }

    Err(WatchError::EndedEarly {
        execution: handle.name.clone(),
        events,
    })
}

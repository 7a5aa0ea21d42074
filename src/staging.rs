//! Staging of input files in object storage
//!
//! Large inputs are uploaded to a bucket before submission and passed to the task by
//! key instead of inline. The bucket is reached through the [`ObjectStore`] trait;
//! [`MemoryObjectStore`] is an in-process implementation for tests and local runs.

use crate::error::{Error, Result};
use crate::types::{ArtifactDescriptor, Event};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// Object storage bucket used to stage inputs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Read the object stored under `key`
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Keys starting with `prefix`, in lexicographic order
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Uploads inputs and checks that they landed intact
#[derive(Clone)]
pub struct InputStager {
    store: Arc<dyn ObjectStore>,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl InputStager {
    /// Create a stager over a bucket
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            event_tx: None,
        }
    }

    /// Publish staging events on the given channel
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Upload an input and return an artifact referencing it by key
    ///
    /// The object is read back after the upload; a size mismatch is an error.
    pub async fn stage(&self, name: &str, key: &str, bytes: Vec<u8>) -> Result<ArtifactDescriptor> {
        if key.is_empty() {
            return Err(Error::Storage("object key must not be empty".to_string()));
        }

        let size = bytes.len();
        self.store.put(key, bytes).await?;

        let stored = self.store.get(key).await?;
        if stored.len() != size {
            return Err(Error::Storage(format!(
                "object {} has {} bytes after upload, expected {}",
                key,
                stored.len(),
                size
            )));
        }

        tracing::info!(key, size, "input staged");
        if let Some(tx) = &self.event_tx {
            tx.send(Event::InputStaged {
                key: key.to_string(),
                size: size as u64,
            })
            .ok();
        }

        Ok(ArtifactDescriptor::reference(name, key))
    }

    /// Keys of staged inputs under a prefix
    pub async fn staged(&self, prefix: &str) -> Result<Vec<String>> {
        self.store.list(prefix).await
    }
}

/// Bucket kept in process memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    /// Create an empty bucket
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("no such object: {}", key)))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

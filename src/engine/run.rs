//! Submit, watch and harvest one execution at a time

use super::ExecutionEngine;
use crate::error::{Error, Result};
use crate::outputs;
use crate::types::{Completion, Event, ExecutionRequest, OutputBundle};
use std::time::Duration;

impl ExecutionEngine {
    /// Run one request to completion and collect its outputs
    ///
    /// Waits at most the configured watch deadline. A terminal `Failed` or `Error` status
    /// still yields a bundle; check [`OutputBundle::succeeded`].
    pub async fn run(&self, request: ExecutionRequest) -> Result<OutputBundle> {
        self.run_with_deadline(request, self.config.watch.deadline)
            .await
    }

    /// Run one request, waiting at most `deadline` for a terminal status
    pub async fn run_with_deadline(
        &self,
        request: ExecutionRequest,
        deadline: Duration,
    ) -> Result<OutputBundle> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Cancelled {
                execution: request.task_id,
            });
        }

        let handle = self.submitter.submit(&request).await?;
        self.event_tx
            .send(Event::Submitted {
                execution: handle.clone(),
                task_id: request.task_id.clone(),
            })
            .ok();

        let completion = self.watcher.watch(&handle, deadline, &self.shutdown).await?;
        Ok(self.harvest(completion).await)
    }

    /// Run requests one after another, in input order
    ///
    /// Each request gets its own result; a failed request does not stop the ones after it.
    pub async fn run_all(
        &self,
        requests: impl IntoIterator<Item = ExecutionRequest>,
    ) -> Vec<Result<OutputBundle>> {
        let mut results = Vec::new();

        for (index, request) in requests.into_iter().enumerate() {
            let task_id = request.task_id.clone();
            let result = self.run(request).await;
            if let Err(e) = &result {
                tracing::warn!(index, task = %task_id, error = %e, "execution failed");
            }
            results.push(result);
        }

        results
    }

    /// Build the output bundle of a completed execution
    pub async fn harvest(&self, completion: Completion) -> OutputBundle {
        let parameters = outputs::normalize(completion.output_parameters());
        let declared = completion.output_artifacts();
        let artifacts = self.fetcher.fetch_all(&completion, &declared).await;

        tracing::info!(
            execution = %completion.handle,
            status = %completion.status,
            parameters = parameters.len(),
            artifacts = artifacts.len(),
            skipped = declared.len() - artifacts.len(),
            "outputs harvested"
        );

        OutputBundle {
            execution: completion.handle,
            status: completion.status,
            parameters,
            artifacts,
        }
    }
}

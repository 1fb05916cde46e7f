//! Bounded worker pool for page and asset tasks
//!
//! This module handles:
//! - Limiting concurrent tasks with a semaphore
//! - Joining every spawned task before returning
//! - Logging individual task panics without failing the batch
//! - Stopping queued and in-flight tasks when the run is cancelled
//! - Running every task inside the caller's tracing span

use crate::MirrorError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Structured task group with bounded width
#[derive(Debug, Clone)]
pub struct WorkerPool {
    limit: Arc<Semaphore>,
    width: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Creates a pool running at most `width` tasks at once
    pub fn new(width: usize, cancel: CancellationToken) -> Self {
        let width = width.max(1);
        Self {
            limit: Arc::new(Semaphore::new(width)),
            width,
            cancel,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs one task per item and waits for all of them
    ///
    /// # Arguments
    ///
    /// * `items` - Work items; one task is spawned per item
    /// * `work` - Builds the task future for an item
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<T>)` - Outputs of the tasks that completed, in completion order
    /// * `Err(MirrorError::Cancelled)` - The run was cancelled during the batch
    pub async fn run_batch<I, F, Fut, T>(&self, items: I, work: F) -> Result<Vec<T>, MirrorError>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut tasks = JoinSet::new();

        for item in items {
            let task = work(item);
            let limit = Arc::clone(&self.limit);
            let cancel = self.cancel.clone();

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    permit = limit.acquire_owned() => permit.ok()?,
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    output = task => Some(output),
                }
            }
            .in_current_span());
        }

        let mut outputs = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(output)) => outputs.push(output),
                Ok(None) => {}
                Err(e) if e.is_panic() => tracing::error!("Worker task panicked: {}", e),
                Err(e) => tracing::debug!("Worker task aborted: {}", e),
            }
        }

        if self.cancel.is_cancelled() {
            return Err(MirrorError::Cancelled);
        }
        Ok(outputs)
    }
}

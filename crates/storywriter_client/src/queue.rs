//! crates/storywriter_client/src/queue.rs
//!
//! Single-slot FIFO request queue. One worker task runs the submitted jobs one at
//! a time and pauses for a fixed delay after each, so the upstream never sees
//! more than one request in flight nor more than one request per delay window.

use crate::error::ClientError;
use futures::{future::BoxFuture, FutureExt};
use std::{future::Future, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

type Job = BoxFuture<'static, ()>;

pub struct RequestQueue {
    sender: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl RequestQueue {
    /// Starts the worker. Must be called inside a Tokio runtime.
    pub fn new(spacing: Duration) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job.await;
                tokio::time::sleep(spacing).await;
            }
            debug!("Request queue drained and closed");
        });
        Self { sender, worker }
    }

    /// Enqueues `task` and waits for its result.
    ///
    /// The task runs even if the caller stops waiting.
    pub async fn submit<T, F>(&self, task: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job = async move {
            let result = task.await;
            if let Err(e) = &result {
                warn!("Queued request failed: {}", e);
            }
            let _ = reply.send(result);
        }
        .boxed();

        self.sender.send(job).map_err(|_| ClientError::QueueClosed)?;
        response.await.map_err(|_| ClientError::QueueClosed)?
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

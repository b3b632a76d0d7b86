//! Completion contexts.
//!
//! Callback-style fetches finish on a Tokio worker. Before a callback runs,
//! the client hands it to a [`Dispatcher`], which decides where it executes:
//!
//! - [`InlineDispatcher`] runs it immediately on the worker.
//! - [`QueueDispatcher`] sends it to a [`CompletionQueue`], and the queue's
//!   owner runs it on its own context (an event loop, a UI thread, `main`).
//!
//! Every callback for one fetch is packaged as a single job, so iterator
//! calls from `each` never interleave with jobs from other fetches.

use tokio::sync::mpsc;

/// A unit of completion work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Decides the execution context for completion callbacks.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// Runs jobs on the task that completed the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Sends jobs to a [`CompletionQueue`].
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::debug!("Completion queue closed, dropping callback");
        }
    }
}

/// Receiving end of a [`QueueDispatcher`].
#[derive(Debug)]
pub struct CompletionQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

/// Create a connected dispatcher/queue pair.
pub fn completion_queue() -> (QueueDispatcher, CompletionQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueDispatcher { tx }, CompletionQueue { rx })
}

impl CompletionQueue {
    /// Wait for the next job and run it on the caller's context.
    ///
    /// Returns `false` once every dispatcher is gone and the queue is drained.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run every job that is ready now without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

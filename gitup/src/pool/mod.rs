//! Bounded task runner.
//!
//! A [`WorkerPool`] runs posted tasks on a fixed number of long-lived tokio
//! workers pulling from one shared queue. It knows nothing about what a task
//! does; completion tracking and result reporting live in [`CompletionBarrier`]
//! and [`Reporter`], owned by whoever posts the work.

mod barrier;
mod report;

pub use barrier::{CompletionBarrier, Ticket};
pub use report::{OutcomeSink, Reporter};

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Error type a task may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of work accepted by a [`TaskRunner`].
pub type Task = BoxFuture<'static, Result<(), BoxError>>;

/// Something that executes posted tasks asynchronously.
pub trait TaskRunner: Send + Sync {
    /// Enqueues `task` without waiting for it to run.
    fn post(&self, task: Task);
}

/// Boxes a future into a [`Task`].
pub fn task<F, E>(future: F) -> Task
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    async move { future.await.map_err(Into::into) }.boxed()
}

/// Fixed-size pool of workers sharing an unbounded queue.
pub struct WorkerPool {
    sender: mpsc::UnboundedSender<Task>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one) on the current tokio runtime.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Arc::new(Mutex::new(receiver));
        let workers = (0..size)
            .map(|id| tokio::spawn(worker(id, Arc::clone(&queue))))
            .collect();
        debug!(size, "Worker pool started");
        Self { sender, workers }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue and waits for the workers to finish what was posted.
    pub async fn shutdown(self) {
        drop(self.sender);
        for handle in self.workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker exited abnormally");
            }
        }
        debug!("Worker pool stopped");
    }
}

impl TaskRunner for WorkerPool {
    fn post(&self, task: Task) {
        if self.sender.send(task).is_err() {
            warn!("Task posted to a stopped worker pool, dropping it");
        }
    }
}

async fn worker(id: usize, queue: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(task) = next else { break };

        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(worker = id, error = %e, "Task returned an error"),
            Err(_) => error!(worker = id, "Task panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn runs_every_posted_task() {
        let pool = WorkerPool::new(3);
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let done = Arc::clone(&done);
            pool.post(task(async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }));
        }
        pool.shutdown().await;

        assert_eq!(done.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_pool_size() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.post(task(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }));
        }
        pool.shutdown().await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn survives_failing_and_panicking_tasks() {
        let pool = WorkerPool::new(1);
        let done = Arc::new(AtomicUsize::new(0));

        pool.post(task(async { Err::<(), _>("nope") }));
        pool.post(task(async {
            if always() {
                panic!("task blew up");
            }
            Ok::<_, BoxError>(())
        }));
        let after = Arc::clone(&done);
        pool.post(task(async move {
            after.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(())
        }));
        pool.shutdown().await;

        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    fn always() -> bool {
        true
    }

    #[tokio::test]
    async fn zero_size_still_gets_a_worker() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
        pool.shutdown().await;
    }
}

//! Bounded concurrency and caller deadlines for asynchronous tasks
//!
//! A [`Throttle`] admits at most `concurrency` invocations of its task at a
//! time; the rest wait on a fair (FIFO) semaphore.
//!
//! A [`Deadline`] fails the caller once a call runs too long. The call itself
//! is spawned and keeps running in the background until it settles, so a
//! throttle slot or a pending cache entry underneath stays held by the real
//! work; its eventual result is discarded.

use crate::{Error, Result, Task};
use futures_util::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Largest concurrency a throttle accepts.
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

pub struct Throttle<A, T> {
    task: Task<A, T>,
    permits: Option<Arc<Semaphore>>,
    concurrency: usize,
    queued: Arc<AtomicUsize>,
}

impl<A, T> Clone for Throttle<A, T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            permits: self.permits.clone(),
            concurrency: self.concurrency,
            queued: self.queued.clone(),
        }
    }
}

/// Keeps the queue gauge honest when a waiting caller is dropped.
struct QueueGuard(Arc<AtomicUsize>);

impl QueueGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter.clone())
    }
}

impl Drop for QueueGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl<A, T> Throttle<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    /// `concurrency == 0` disables admission control.
    ///
    /// # Panics
    ///
    /// Panics if `concurrency` exceeds [`MAX_CONCURRENCY`]. Configurations
    /// built through [`crate::JaccardConfig`] are validated before this point.
    pub fn new(task: Task<A, T>, concurrency: usize) -> Self {
        Self {
            task,
            permits: (concurrency > 0).then(|| Arc::new(Semaphore::new(concurrency))),
            concurrency,
            queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call(&self, args: A) -> BoxFuture<'static, Result<T>> {
        let throttle = self.clone();
        async move { throttle.run(args).await }.boxed()
    }

    pub fn into_task(self) -> Task<A, T> {
        Task::from_boxed(move |args| self.call(args))
    }

    async fn run(&self, args: A) -> Result<T> {
        let Some(permits) = &self.permits else {
            return self.task.call(args).await;
        };

        let permit = {
            let _queued = QueueGuard::enter(&self.queued);
            permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Aborted("throttle closed".to_string()))?
        };
        debug!(running = self.running(), limit = self.concurrency, "throttle admitted task");

        let result = self.task.call(args).await;
        drop(permit);
        result
    }

    /// Invocations currently holding a slot.
    pub fn running(&self) -> usize {
        match &self.permits {
            Some(permits) => self.concurrency - permits.available_permits(),
            None => 0,
        }
    }

    /// Invocations waiting for a slot.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

/// Caller-facing timeout around a task.
pub struct Deadline<A, T> {
    task: Task<A, T>,
    limit: Option<Duration>,
}

impl<A, T> Clone for Deadline<A, T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            limit: self.limit,
        }
    }
}

impl<A, T> Deadline<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    /// A `limit` of `None` or zero disables the timeout.
    pub fn new(task: Task<A, T>, limit: Option<Duration>) -> Self {
        Self {
            task,
            limit: limit.filter(|limit| !limit.is_zero()),
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn call(&self, args: A) -> BoxFuture<'static, Result<T>> {
        let job = self.task.call(args);
        let Some(limit) = self.limit else {
            return job;
        };

        async move {
            let handle = tokio::spawn(job);
            match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined?,
                Err(_) => {
                    warn!(?limit, "call timed out; leaving it to finish in the background");
                    Err(Error::Timeout(limit))
                }
            }
        }
        .boxed()
    }

    pub fn into_task(self) -> Task<A, T> {
        Task::from_boxed(move |args| self.call(args))
    }
}

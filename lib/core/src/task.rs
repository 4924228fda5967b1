//! Uniform asynchronous tasks
//!
//! Every user callback (log loader, item enumerator, scorer) is adapted into
//! a [`Task`] once, at construction time. A callback produces an [`Outcome`]:
//! either a value that is already known or a future that will yield it.
//! [`Task::adapt`] is the single place where that distinction is erased.

use crate::{Error, Result};
use futures_util::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a callback hands back: a settled result or a deferred one.
pub enum Outcome<T> {
    Ready(Result<T>),
    Pending(BoxFuture<'static, Result<T>>),
}

impl<T: Send + 'static> Outcome<T> {
    pub fn ready(value: T) -> Self {
        Outcome::Ready(Ok(value))
    }

    pub fn failed(err: Error) -> Self {
        Outcome::Ready(Err(err))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Outcome::Pending(future.boxed())
    }

    pub fn into_future(self) -> BoxFuture<'static, Result<T>> {
        match self {
            Outcome::Ready(result) => future::ready(result).boxed(),
            Outcome::Pending(future) => future,
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        Outcome::Ready(result)
    }
}

type TaskFn<A, T> = dyn Fn(A) -> BoxFuture<'static, Result<T>> + Send + Sync;

/// A shareable asynchronous function from `A` to `Result<T>`.
///
/// Calling a task never runs user code eagerly beyond what the callback
/// itself does; wrappers such as [`crate::Throttle`] and [`crate::Memo`]
/// decide when `call` happens.
pub struct Task<A, T> {
    inner: Arc<TaskFn<A, T>>,
}

impl<A, T> Clone for Task<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, T> fmt::Debug for Task<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

impl<A: 'static, T: Send + 'static> Task<A, T> {
    /// Adapt a callback returning an [`Outcome`].
    pub fn adapt<F>(callback: F) -> Self
    where
        F: Fn(A) -> Outcome<T> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |args| callback(args).into_future()),
        }
    }

    /// Adapt a synchronous callback.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(A) -> Result<T> + Send + Sync + 'static,
    {
        Self::adapt(move |args| Outcome::Ready(callback(args)))
    }

    /// Adapt a callback returning a future.
    pub fn from_async<F, Fut>(callback: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::adapt(move |args| Outcome::pending(callback(args)))
    }

    /// A task that always fails with [`Error::NotImplemented`].
    pub fn unimplemented(name: &'static str) -> Self {
        Self::adapt(move |_| Outcome::failed(Error::NotImplemented(name)))
    }

    pub(crate) fn from_boxed<F>(callback: F) -> Self
    where
        F: Fn(A) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(callback),
        }
    }

    pub fn call(&self, args: A) -> BoxFuture<'static, Result<T>> {
        (self.inner)(args)
    }
}

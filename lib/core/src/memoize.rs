//! Key-addressed memoization with expiry and in-flight coalescing
//!
//! A [`Memo`] wraps a [`Task`] and keeps, per key, either the shared future of
//! the computation currently running or the settled value with its expiry
//! time. At most one underlying invocation runs per key at any moment; every
//! concurrent caller for that key awaits the same shared future.
//!
//! Failures are never cached. Callers that coalesced onto a failing
//! computation all receive its error, then the slot is dropped so the next
//! call retries.

use crate::{Result, Task};
use ahash::AHashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Derives the cache key for a call's arguments.
pub type KeyFn<A> = Arc<dyn Fn(&A) -> String + Send + Sync>;

/// Caching behaviour of a [`Memo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoPolicy {
    /// How long a settled value stays live. `None` disables caching.
    pub expire: Option<Duration>,
    /// Share in-flight computations even when caching is disabled.
    pub coalesce: bool,
}

impl MemoPolicy {
    pub fn new(expire: Option<Duration>, coalesce: bool) -> Self {
        Self {
            expire: expire.filter(|ttl| !ttl.is_zero()),
            coalesce,
        }
    }

    /// No caching and no coalescing: every call reaches the task.
    pub fn passthrough() -> Self {
        Self::default()
    }

    fn is_active(&self) -> bool {
        self.expire.is_some() || self.coalesce
    }
}

type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;

enum Slot<T> {
    Pending { id: u64, future: SharedResult<T> },
    Ready { value: T, expires_at: Instant },
}

struct MemoState<T> {
    slots: AHashMap<String, Slot<T>>,
    next_id: u64,
    last_sweep: Instant,
}

impl<T> MemoState<T> {
    /// Drop settled slots whose expiry has passed. Runs at most once per TTL.
    fn sweep(&mut self, now: Instant, ttl: Duration) -> usize {
        if now.duration_since(self.last_sweep) < ttl {
            return 0;
        }
        self.last_sweep = now;
        self.evict(now)
    }

    fn evict(&mut self, now: Instant) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| !matches!(slot, Slot::Ready { expires_at, .. } if *expires_at <= now));
        before - self.slots.len()
    }
}

enum Lookup<T> {
    Hit(T),
    Wait(u64, SharedResult<T>),
    Miss,
}

/// A memoized [`Task`].
pub struct Memo<A, T> {
    task: Task<A, T>,
    key_fn: KeyFn<A>,
    policy: MemoPolicy,
    state: Arc<Mutex<MemoState<T>>>,
}

impl<A, T> Clone for Memo<A, T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            key_fn: self.key_fn.clone(),
            policy: self.policy,
            state: self.state.clone(),
        }
    }
}

impl<A, T> Memo<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(task: Task<A, T>, key_fn: KeyFn<A>, policy: MemoPolicy) -> Self {
        Self {
            task,
            key_fn,
            policy,
            state: Arc::new(Mutex::new(MemoState {
                slots: AHashMap::new(),
                next_id: 0,
                last_sweep: Instant::now(),
            })),
        }
    }

    pub fn policy(&self) -> MemoPolicy {
        self.policy
    }

    pub fn call(&self, args: A) -> BoxFuture<'static, Result<T>> {
        let memo = self.clone();
        async move { memo.resolve(args).await }.boxed()
    }

    /// The memoized function as a plain [`Task`], for further wrapping.
    pub fn into_task(self) -> Task<A, T> {
        Task::from_boxed(move |args| self.call(args))
    }

    async fn resolve(&self, args: A) -> Result<T> {
        if !self.policy.is_active() {
            return self.task.call(args).await;
        }

        let key = (self.key_fn)(&args);
        let (id, future) = match self.lookup(&key) {
            Lookup::Hit(value) => {
                debug!(key = %key, "memo hit");
                return Ok(value);
            }
            Lookup::Wait(id, future) => {
                debug!(key = %key, "memo coalesced onto in-flight call");
                (id, future)
            }
            Lookup::Miss => {
                debug!(key = %key, "memo miss");
                self.start(&key, args)
            }
        };

        let result = future.await;
        self.settle(&key, id, &result);
        result
    }

    fn lookup(&self, key: &str) -> Lookup<T> {
        let mut state = self.state.lock();
        let now = Instant::now();
        if let Some(ttl) = self.policy.expire {
            let evicted = state.sweep(now, ttl);
            if evicted > 0 {
                debug!(evicted, "memo swept expired entries");
            }
        }
        match state.slots.get(key) {
            Some(Slot::Ready { value, expires_at }) if *expires_at > now => Lookup::Hit(value.clone()),
            Some(Slot::Pending { id, future }) => Lookup::Wait(*id, future.clone()),
            _ => Lookup::Miss,
        }
    }

    /// Register a new in-flight computation for `key`.
    ///
    /// The task is only invoked when the shared future is first polled, so no
    /// user code runs while the state lock is held.
    fn start(&self, key: &str, args: A) -> (u64, SharedResult<T>) {
        let task = self.task.clone();
        let future = async move { task.call(args).await }.boxed().shared();

        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.slots.insert(
            key.to_string(),
            Slot::Pending {
                id,
                future: future.clone(),
            },
        );
        (id, future)
    }

    /// Record the outcome of computation `id`. Only the first waiter to
    /// settle a given computation touches the slot.
    fn settle(&self, key: &str, id: u64, result: &Result<T>) {
        let mut state = self.state.lock();
        let current = matches!(state.slots.get(key), Some(Slot::Pending { id: pending, .. }) if *pending == id);
        if !current {
            return;
        }
        match (result, self.policy.expire) {
            (Ok(value), Some(ttl)) => {
                state.slots.insert(
                    key.to_string(),
                    Slot::Ready {
                        value: value.clone(),
                        expires_at: Instant::now() + ttl,
                    },
                );
            }
            (Err(err), _) => {
                debug!(key = %key, error = %err, "memo dropped failed entry");
                state.slots.remove(key);
            }
            (Ok(_), None) => {
                state.slots.remove(key);
            }
        }
    }

    /// Number of live or in-flight entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .lock()
            .slots
            .values()
            .filter(|slot| match slot {
                Slot::Ready { expires_at, .. } => *expires_at > now,
                Slot::Pending { .. } => true,
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict every expired entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.state.lock().evict(Instant::now())
    }

    /// Drop every settled entry. In-flight computations keep running and
    /// their waiters are unaffected.
    pub fn clear(&self) {
        self.state
            .lock()
            .slots
            .retain(|_, slot| matches!(slot, Slot::Pending { .. }));
    }
}

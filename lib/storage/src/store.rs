use ahash::AHashMap;
use jaccard_core::{Jaccard, JaccardBuilder, JaccardConfig, Log, Result, Task};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct StoreInner {
    /// Items in first-seen order.
    order: Vec<String>,
    logs: AHashMap<String, Vec<String>>,
}

/// In-memory item logs fed one (item, member) record at a time.
///
/// Engines built from a store read it on every load; with caching enabled a
/// loaded log stays in the engine cache until it expires, so later
/// `add_log` calls become visible only after that.
#[derive(Clone, Default)]
pub struct LogStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `member` to the log of `item`.
    pub fn add_log(&self, item: impl Into<String>, member: impl Into<String>) {
        let item = item.into();
        let mut inner = self.inner.write();
        match inner.logs.get_mut(&item) {
            Some(log) => log.push(member.into()),
            None => {
                inner.order.push(item.clone());
                inner.logs.insert(item, vec![member.into()]);
            }
        }
    }

    /// Append many (item, member) records.
    pub fn extend<It, A, B>(&self, records: It)
    where
        It: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        for (item, member) in records {
            self.add_log(item, member);
        }
    }

    pub fn items(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    pub fn log(&self, item: &str) -> Option<Log> {
        self.inner
            .read()
            .logs
            .get(item)
            .map(|members| Log::new(members.iter().cloned()))
    }

    /// Forget an item and its log.
    pub fn remove(&self, item: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.logs.remove(item).is_none() {
            return false;
        }
        inner.order.retain(|known| known != item);
        true
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn loader(&self) -> Task<String, Option<Log>> {
        let store = self.clone();
        Task::from_fn(move |item: String| Ok(store.log(&item)))
    }

    pub fn items_task(&self) -> Task<(), Vec<String>> {
        let store = self.clone();
        Task::from_fn(move |()| Ok(store.items()))
    }

    /// A builder whose loader and items enumerator read from this store.
    pub fn builder(&self) -> JaccardBuilder<String> {
        JaccardBuilder::new()
            .loader(self.loader())
            .items(self.items_task())
    }

    pub fn engine(&self, config: JaccardConfig) -> Result<Jaccard<String>> {
        debug!(items = self.len(), "building engine over log store");
        self.builder().config(config).build()
    }
}

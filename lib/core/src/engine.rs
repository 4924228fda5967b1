//! Pairwise similarity engine
//!
//! [`Jaccard`] walks a source list against a target list (source-major,
//! target-minor) and scores every pair through a pipeline built once by
//! [`JaccardBuilder::build`]:
//!
//! ```text
//! pair ──> Deadline ──> Memo (scores) ──> Throttle ──> score task ──┬─> Memo (logs) ──> Throttle ──> loader
//!                                                                   └─> score fn (Jaccard index by default)
//! ```
//!
//! The deadline sits in front of each cache, so a timed-out caller leaves the
//! pending entry attached to the work that is still running and later callers
//! for the same key wait on it instead of starting it again.
//!
//! With direction disabled each unordered pair is scored through a single
//! cache key (the lexicographically smaller item key goes first), so the
//! mirrored lookup never computes again while the entry is live. Steps are
//! awaited one at a time, which keeps the output order deterministic.

use crate::config::JaccardConfig;
use crate::filter::{Identity, ScoreFilter};
use crate::graph::{Link, Matrix};
use crate::memoize::{KeyFn, Memo};
use crate::pace::Pace;
use crate::similarity::Log;
use crate::sink::LinkSink;
use crate::task::Task;
use crate::throttle::{Deadline, Throttle};
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, trace};

const KEY_SEPARATOR: char = '\u{0}';

/// Normalizes an item into the string used for cache keys, self-comparison
/// checks, pair ordering and matrix keys.
pub type IdFn<I> = Arc<dyn Fn(&I) -> String + Send + Sync>;

/// Compares two loaded logs.
pub type ScoreFn = Arc<dyn Fn(&Log, &Log) -> Option<f64> + Send + Sync>;

/// Items that are their own key.
pub trait ItemKey {
    fn item_key(&self) -> String;
}

impl ItemKey for String {
    fn item_key(&self) -> String {
        self.clone()
    }
}

impl ItemKey for &'static str {
    fn item_key(&self) -> String {
        (*self).to_string()
    }
}

impl ItemKey for PathBuf {
    fn item_key(&self) -> String {
        self.to_string_lossy().into_owned()
    }
}

macro_rules! impl_item_key_display {
    ($($ty:ty),*) => {
        $(impl ItemKey for $ty {
            fn item_key(&self) -> String {
                self.to_string()
            }
        })*
    };
}

impl_item_key_display!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char);

fn pair_key(source: &str, target: &str) -> String {
    let mut key = String::with_capacity(source.len() + target.len() + 1);
    key.push_str(source);
    key.push(KEY_SEPARATOR);
    key.push_str(target);
    key
}

/// Where an enumeration takes its item list from.
pub enum Items<I> {
    /// Ask the configured items enumerator.
    All,
    List(Vec<I>),
    /// Resolve asynchronously when the enumeration starts.
    Deferred(Task<(), Vec<I>>),
}

impl<I> From<Vec<I>> for Items<I> {
    fn from(items: Vec<I>) -> Self {
        Items::List(items)
    }
}

impl<I: Clone> From<&[I]> for Items<I> {
    fn from(items: &[I]) -> Self {
        Items::List(items.to_vec())
    }
}

impl<I> From<Task<(), Vec<I>>> for Items<I> {
    fn from(task: Task<(), Vec<I>>) -> Self {
        Items::Deferred(task)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JaccardStats {
    pub cached_logs: usize,
    pub cached_scores: usize,
    pub running_loads: usize,
    pub running_scores: usize,
}

/// Assembles a [`Jaccard`] engine.
///
/// `V` is the recorded value type: the score itself unless
/// [`JaccardBuilder::annotate`] installs a filter producing something else.
pub struct JaccardBuilder<I, V = f64> {
    config: JaccardConfig,
    id_fn: IdFn<I>,
    loader: Option<Task<I, Option<Log>>>,
    items: Option<Task<(), Vec<I>>>,
    score_fn: ScoreFn,
    filter: Arc<dyn ScoreFilter<I, V>>,
}

impl<I> JaccardBuilder<I>
where
    I: ItemKey + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_id_fn(|item: &I| item.item_key())
    }
}

impl<I> Default for JaccardBuilder<I>
where
    I: ItemKey + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I> JaccardBuilder<I>
where
    I: Clone + Send + Sync + 'static,
{
    /// Start a builder for structured items that are keyed through `id_fn`.
    pub fn with_id_fn<F>(id_fn: F) -> Self
    where
        F: Fn(&I) -> String + Send + Sync + 'static,
    {
        Self {
            config: JaccardConfig::default(),
            id_fn: Arc::new(id_fn),
            loader: None,
            items: None,
            score_fn: Arc::new(|source: &Log, target: &Log| source.jaccard(target)),
            filter: Arc::new(Identity),
        }
    }
}

impl<I, V> JaccardBuilder<I, V>
where
    I: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn id_fn<F>(mut self, id_fn: F) -> Self
    where
        F: Fn(&I) -> String + Send + Sync + 'static,
    {
        self.id_fn = Arc::new(id_fn);
        self
    }

    pub fn config(mut self, config: JaccardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn expire(mut self, millis: u64) -> Self {
        self.config.expire = Some(millis);
        self
    }

    pub fn throttle(mut self, concurrency: usize) -> Self {
        self.config.throttle = Some(concurrency);
        self
    }

    pub fn timeout(mut self, millis: u64) -> Self {
        self.config.timeout = Some(millis);
        self
    }

    pub fn direction(mut self, direction: bool) -> Self {
        self.config.direction = direction;
        self
    }

    pub fn wait(mut self, millis: u64) -> Self {
        self.config.wait = Some(millis);
        self
    }

    pub fn coalesce(mut self, coalesce: bool) -> Self {
        self.config.coalesce = coalesce;
        self
    }

    /// Log loader; `Ok(None)` means the item has no log.
    pub fn loader(mut self, loader: Task<I, Option<Log>>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Synchronous, infallible loader.
    pub fn loader_fn<F, L>(self, loader: F) -> Self
    where
        F: Fn(&I) -> Option<L> + Send + Sync + 'static,
        L: Into<Log>,
    {
        self.loader(Task::from_fn(move |item: I| Ok(loader(&item).map(Into::into))))
    }

    /// Asynchronous, fallible loader.
    pub fn async_loader<F, Fut, L>(self, loader: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<L>>> + Send + 'static,
        L: Into<Log> + Send + 'static,
    {
        self.loader(Task::from_async(move |item: I| {
            let pending = loader(item);
            async move { pending.await.map(|log| log.map(Into::into)) }
        }))
    }

    /// Enumerator used by [`Items::All`].
    pub fn items(mut self, items: Task<(), Vec<I>>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn items_fn<F>(self, items: F) -> Self
    where
        F: Fn() -> Vec<I> + Send + Sync + 'static,
    {
        self.items(Task::from_fn(move |()| Ok(items())))
    }

    /// Replace the Jaccard index with another comparison.
    pub fn score_fn<F>(mut self, score_fn: F) -> Self
    where
        F: Fn(&Log, &Log) -> Option<f64> + Send + Sync + 'static,
    {
        self.score_fn = Arc::new(score_fn);
        self
    }

    pub fn filter(mut self, filter: impl ScoreFilter<I, V> + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Replace the filter with one recording a different value type, for
    /// example the score tagged with its pair.
    pub fn annotate<W, F>(self, filter: F) -> JaccardBuilder<I, W>
    where
        F: ScoreFilter<I, W> + 'static,
    {
        JaccardBuilder {
            config: self.config,
            id_fn: self.id_fn,
            loader: self.loader,
            items: self.items,
            score_fn: self.score_fn,
            filter: Arc::new(filter),
        }
    }

    /// Validate the configuration and wire the log and score pipelines.
    ///
    /// A missing loader is not an error here; every load fails with
    /// [`Error::NotImplemented`] instead.
    pub fn build(self) -> Result<Jaccard<I, V>> {
        self.config.validate()?;
        let policy = self.config.memo_policy();
        let concurrency = self.config.concurrency();
        let timeout = self.config.timeout();

        let loader = self
            .loader
            .unwrap_or_else(|| Task::unimplemented("log loader"));
        let loads = Throttle::new(loader, concurrency);
        let logs = Memo::new(loads.clone().into_task(), self.id_fn.clone(), policy);
        let log_calls = Deadline::new(logs.clone().into_task(), timeout);

        let score_task = {
            let logs = logs.clone();
            let score_fn = self.score_fn.clone();
            Task::from_async(move |(source, target): (I, I)| {
                let logs = logs.clone();
                let score_fn = score_fn.clone();
                async move {
                    let Some(source_log) = logs.call(source).await? else {
                        return Ok(None);
                    };
                    let Some(target_log) = logs.call(target).await? else {
                        return Ok(None);
                    };
                    Ok(score_fn(&source_log, &target_log))
                }
            })
        };
        let raw_scores = Throttle::new(score_task, concurrency);
        let id_fn = self.id_fn.clone();
        let score_key: KeyFn<(I, I)> =
            Arc::new(move |(source, target): &(I, I)| pair_key(&id_fn(source), &id_fn(target)));
        let scores = Memo::new(raw_scores.clone().into_task(), score_key, policy);
        let score_calls = Deadline::new(scores.clone().into_task(), timeout);
        let index_calls = Deadline::new(raw_scores.clone().into_task(), timeout);

        debug!(config = ?self.config, "jaccard engine built");
        Ok(Jaccard {
            direction: self.config.direction,
            pace: self.config.pace(),
            id_fn: self.id_fn,
            items: self.items,
            logs,
            loads,
            log_calls,
            raw_scores,
            scores,
            score_calls,
            index_calls,
            filter: self.filter,
            config: self.config,
        })
    }
}

#[derive(Clone, Copy)]
enum Walk {
    /// One visit per unordered pair unless direction is enabled.
    Links,
    /// Every (source, target) slot.
    Matrix,
}

/// Computes similarity links and matrices over item logs.
#[derive(Clone)]
pub struct Jaccard<I, V = f64> {
    direction: bool,
    pace: Pace,
    id_fn: IdFn<I>,
    items: Option<Task<(), Vec<I>>>,
    logs: Memo<I, Option<Log>>,
    loads: Throttle<I, Option<Log>>,
    log_calls: Deadline<I, Option<Log>>,
    raw_scores: Throttle<(I, I), Option<f64>>,
    scores: Memo<(I, I), Option<f64>>,
    score_calls: Deadline<(I, I), Option<f64>>,
    index_calls: Deadline<(I, I), Option<f64>>,
    filter: Arc<dyn ScoreFilter<I, V>>,
    config: JaccardConfig,
}

impl<I, V> fmt::Debug for Jaccard<I, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jaccard")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<I, V> Jaccard<I, V>
where
    I: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn config(&self) -> &JaccardConfig {
        &self.config
    }

    pub fn key_of(&self, item: &I) -> String {
        (self.id_fn)(item)
    }

    /// Load a log through the cache.
    pub async fn cached_log(&self, item: &I) -> Result<Option<Log>> {
        self.log_calls.call(item.clone()).await
    }

    /// Score one ordered pair, bypassing the score cache.
    pub async fn get_index(&self, source: &I, target: &I) -> Result<Option<f64>> {
        self.index_calls.call((source.clone(), target.clone())).await
    }

    /// Score one pair through the score cache.
    pub async fn cached_index(&self, source: &I, target: &I) -> Result<Option<f64>> {
        let source_key = self.key_of(source);
        let target_key = self.key_of(target);
        self.score(source, target, &source_key, &target_key).await
    }

    /// Resolve [`Items::All`] through the configured enumerator.
    pub async fn items(&self) -> Result<Vec<I>> {
        self.resolve(Items::All).await
    }

    /// Edge list of every defined, unfiltered score in traversal order.
    ///
    /// `targets` defaults to the sources. With direction disabled only the
    /// first visited orientation of each pair is listed.
    pub async fn links(
        &self,
        sources: impl Into<Items<I>>,
        targets: Option<Items<I>>,
    ) -> Result<Vec<Link<I, V>>> {
        let mut links = Vec::new();
        self.walk(sources.into(), targets, Walk::Links, |source, target, _, _, value| {
            links.push(Link::new(source.clone(), target.clone(), value));
            Ok(())
        })
        .await?;
        Ok(links)
    }

    /// Sparse matrix keyed by item keys. Both orientations of a pair are
    /// filled when both are in range, from a single score computation.
    pub async fn matrix(
        &self,
        sources: impl Into<Items<I>>,
        targets: Option<Items<I>>,
    ) -> Result<Matrix<V>> {
        let mut matrix = Matrix::new();
        self.walk(sources.into(), targets, Walk::Matrix, |_, _, source_key, target_key, value| {
            matrix.insert(source_key, target_key, value);
            Ok(())
        })
        .await?;
        Ok(matrix)
    }

    /// Push links into `sink` as they are produced, then end it.
    /// Returns the number of links written.
    pub async fn stream<S>(
        &self,
        sources: impl Into<Items<I>>,
        targets: Option<Items<I>>,
        sink: &mut S,
    ) -> Result<usize>
    where
        S: LinkSink<I, V> + Send,
    {
        let written = self
            .walk(sources.into(), targets, Walk::Links, |source, target, _, _, value| {
                sink.write(Link::new(source.clone(), target.clone(), value))
            })
            .await?;
        sink.end()?;
        Ok(written)
    }

    pub fn stats(&self) -> JaccardStats {
        JaccardStats {
            cached_logs: self.logs.len(),
            cached_scores: self.scores.len(),
            running_loads: self.loads.running(),
            running_scores: self.raw_scores.running(),
        }
    }

    /// Drop every cached log and score.
    pub fn clear_cache(&self) {
        self.logs.clear();
        self.scores.clear();
    }

    fn score(
        &self,
        source: &I,
        target: &I,
        source_key: &str,
        target_key: &str,
    ) -> BoxFuture<'static, Result<Option<f64>>> {
        if !self.direction && target_key < source_key {
            self.score_calls.call((target.clone(), source.clone()))
        } else {
            self.score_calls.call((source.clone(), target.clone()))
        }
    }

    fn canonical_pair(&self, source_key: &str, target_key: &str) -> (String, String) {
        if !self.direction && target_key < source_key {
            (target_key.to_string(), source_key.to_string())
        } else {
            (source_key.to_string(), target_key.to_string())
        }
    }


    async fn resolve(&self, items: Items<I>) -> Result<Vec<I>> {
        match items {
            Items::List(items) => Ok(items),
            Items::Deferred(task) => task.call(()).await,
            Items::All => match &self.items {
                Some(task) => task.call(()).await,
                None => Err(Error::NotImplemented("items enumerator")),
            },
        }
    }

    async fn walk<F>(
        &self,
        sources: Items<I>,
        targets: Option<Items<I>>,
        mode: Walk,
        mut visit: F,
    ) -> Result<usize>
    where
        F: FnMut(&I, &I, &str, &str, V) -> Result<()> + Send,
    {
        let sources = self.resolve(sources).await?;
        let targets = match targets {
            Some(targets) => self.resolve(targets).await?,
            None => sources.clone(),
        };
        let source_keys: Vec<String> = sources.iter().map(|item| self.key_of(item)).collect();
        let target_keys: Vec<String> = targets.iter().map(|item| self.key_of(item)).collect();

        // Links mode: unordered pairs already listed.
        let mut seen: AHashSet<(String, String)> = AHashSet::new();
        // Raw scores of this enumeration, by canonical pair.
        let mut scored: AHashMap<(String, String), Option<f64>> = AHashMap::new();
        let mut produced = 0usize;

        for (source, source_key) in sources.iter().zip(&source_keys) {
            for (target, target_key) in targets.iter().zip(&target_keys) {
                if source_key == target_key {
                    continue;
                }

                let pair = self.canonical_pair(source_key, target_key);
                if matches!(mode, Walk::Links) && !self.direction && !seen.insert(pair.clone()) {
                    continue;
                }

                let raw = match scored.get(&pair).copied() {
                    Some(raw) => raw,
                    None => {
                        let raw = self.score(source, target, source_key, target_key).await?;
                        scored.insert(pair, raw);
                        raw
                    }
                };

                match raw.and_then(|score| self.filter.apply(score, source, target)) {
                    Some(value) => {
                        trace!(source = %source_key, target = %target_key, "pair scored");
                        visit(source, target, source_key, target_key, value)?;
                        produced += 1;
                    }
                    None => trace!(source = %source_key, target = %target_key, "pair omitted"),
                }

                self.pace.pause().await;
            }
        }

        info!(
            sources = sources.len(),
            targets = targets.len(),
            produced,
            "enumeration complete"
        );
        Ok(produced)
    }
}

//! # Jaccard Core
//!
//! Core library for pairwise Jaccard similarity over item logs.
//!
//! This crate provides the similarity function and the machinery wrapped
//! around user-supplied loaders:
//!
//! - [`jaccard_index`] / [`Log`] - set similarity of member tokens
//! - [`Task`] - uniform async wrapper for sync or async callbacks
//! - [`Memo`] - per-key memoization with expiry and in-flight coalescing
//! - [`Throttle`] / [`Deadline`] - bounded concurrency and caller timeouts
//! - [`Jaccard`] - pairwise enumeration into links or a [`Matrix`]
//!
//! ## Example
//!
//! ```rust
//! use jaccard_core::JaccardBuilder;
//! use std::collections::HashMap;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let logs: HashMap<&str, Vec<&str>> = HashMap::from([
//!     ("foo", vec!["user1", "user2"]),
//!     ("bar", vec!["user2", "user3", "user4"]),
//!     ("buz", vec!["user1", "user2", "user5"]),
//! ]);
//!
//! let engine = JaccardBuilder::<String>::new()
//!     .expire(1000)
//!     .loader_fn(move |id: &String| logs.get(id.as_str()).cloned())
//!     .build()
//!     .unwrap();
//!
//! let items: Vec<String> = vec!["foo".into(), "bar".into(), "buz".into()];
//! let matrix = engine.matrix(items, None).await.unwrap();
//! assert_eq!(matrix.get("foo", "bar"), Some(0.25));
//! assert_eq!(matrix.get("buz", "bar"), Some(0.2));
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod graph;
pub mod memoize;
pub mod pace;
pub mod similarity;
pub mod sink;
pub mod task;
pub mod throttle;

pub use config::JaccardConfig;
pub use engine::{IdFn, ItemKey, Items, Jaccard, JaccardBuilder, JaccardStats, ScoreFn};
pub use error::{Error, Result};
pub use filter::{Chain, Identity, MinScore, Round, ScoreFilter};
pub use graph::{Link, Matrix, Row};
pub use memoize::{KeyFn, Memo, MemoPolicy};
pub use pace::Pace;
pub use similarity::{jaccard_index, Log};
pub use sink::LinkSink;
pub use task::{Outcome, Task};
pub use throttle::{Deadline, Throttle, MAX_CONCURRENCY};

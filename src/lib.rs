//! # jaccard-index
//!
//! Pairwise Jaccard similarity over item logs, with memoized and throttled
//! asynchronous loading.
//!
//! Each item (a file, a product, a page) has a log of member tokens (users,
//! words, tags). The similarity of two items is the Jaccard index of their
//! logs. The engine enumerates all pairs of a source list against a target
//! list and reports an edge list or a sparse matrix.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! jaccard foo.txt bar.txt buz.txt
//! jaccard --csv foo.txt bar.txt buz.txt
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use jaccard_index::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let store = LogStore::new();
//! store.add_log("item1", "user1");
//! store.add_log("item1", "user2");
//! store.add_log("item2", "user2");
//!
//! let engine = store.builder().expire(1000).filter(Round(3)).build()?;
//! let links = engine.links(Items::All, None).await?;
//! assert_eq!(links[0].value, 0.5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `jaccard-core` - similarity, task adapter, memoization, throttling and the engine
//! - `jaccard-storage` - in-memory log store and newline-delimited file loader

pub mod output;

// Re-export core types
pub use jaccard_core::{
    jaccard_index, Chain, Deadline, Error, Items, Jaccard, JaccardBuilder, JaccardConfig,
    JaccardStats, Link, LinkSink, Log, Matrix, Memo, MemoPolicy, MinScore, Outcome, Result,
    Round, ScoreFilter, Task, Throttle,
};

// Re-export storage
pub use jaccard_storage::{FileLoader, LogStore};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Error, FileLoader, Items, Jaccard, JaccardBuilder, JaccardConfig, Link, LinkSink, Log,
        LogStore, Matrix, MinScore, Result, Round, ScoreFilter, Task,
    };
}

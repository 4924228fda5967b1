//! Jaccard similarity between member logs
//!
//! The index is `|A ∩ B| / |A ∪ B|` with both inputs treated as sets.
//! Returns `None` when either side is empty, so callers can tell "no data"
//! apart from "no overlap" (`Some(0.0)`).

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

/// The member tokens recorded for one item.
///
/// Duplicates are folded on construction (first occurrence wins), so the
/// length of a `Log` is the size of its set. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Log(Arc<[String]>);

impl Log {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = AHashSet::new();
        let members: Vec<String> = members
            .into_iter()
            .map(Into::into)
            .filter(|member| seen.insert(member.clone()))
            .collect();
        Self(members.into())
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }

    /// Jaccard index against another log.
    ///
    /// Both sides are already sets, so only the shorter one is hashed.
    pub fn jaccard(&self, other: &Log) -> Option<f64> {
        let (shorter, longer) = if self.len() < other.len() {
            (self.members(), other.members())
        } else {
            (other.members(), self.members())
        };
        if shorter.is_empty() {
            return None;
        }

        let presence: AHashSet<&str> = shorter.iter().map(String::as_str).collect();
        let matched = longer
            .iter()
            .filter(|member| presence.contains(member.as_str()))
            .count();

        Some(ratio(matched, shorter.len() + longer.len() - matched))
    }
}

impl Deref for Log {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Log {
    fn from(members: Vec<String>) -> Self {
        Log::new(members)
    }
}

impl From<Vec<&str>> for Log {
    fn from(members: Vec<&str>) -> Self {
        Log::new(members)
    }
}

impl From<&[&str]> for Log {
    fn from(members: &[&str]) -> Self {
        Log::new(members.iter().copied())
    }
}

impl From<Log> for Vec<String> {
    fn from(log: Log) -> Self {
        log.0.to_vec()
    }
}

/// Jaccard index of two arbitrary token sequences.
///
/// A presence set is built from the shorter sequence and the longer one is
/// scanned once. Repeated tokens on either side count once, which costs a
/// set over the distinct tokens of the longer sequence as well. For inputs
/// that are already sets use [`Log::jaccard`], which hashes only the shorter
/// side.
pub fn jaccard_index<T: Hash + Eq>(a: &[T], b: &[T]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (shorter, longer) = if a.len() < b.len() { (a, b) } else { (b, a) };

    let presence: AHashSet<&T> = shorter.iter().collect();
    let mut shared: AHashSet<&T> = AHashSet::new();
    let mut unshared: AHashSet<&T> = AHashSet::new();
    for token in longer {
        if presence.contains(token) {
            shared.insert(token);
        } else {
            unshared.insert(token);
        }
    }

    Some(ratio(shared.len(), presence.len() + unshared.len()))
}

#[inline]
fn ratio(intersection: usize, union: usize) -> f64 {
    intersection as f64 / union as f64
}

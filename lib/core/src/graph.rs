// Similarity graph outputs - edge lists and sparse matrices
use ahash::AHashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// One scored pair. `value` is the filtered score or its annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link<I, V = f64> {
    pub source: I,
    pub target: I,
    pub value: V,
}

impl<I, V> Link<I, V> {
    #[inline]
    #[must_use]
    pub fn new(source: I, target: I, value: V) -> Self {
        Self {
            source,
            target,
            value,
        }
    }
}

/// One source row of a [`Matrix`], cells kept in insertion order.
#[derive(Debug, Clone)]
pub struct Row<V = f64> {
    key: String,
    cells: Vec<(String, V)>,
    index: AHashMap<String, usize>,
}

impl<V> Row<V> {
    fn new(key: String) -> Self {
        Self {
            key,
            cells: Vec::new(),
            index: AHashMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self, target: &str) -> Option<&V> {
        self.index.get(target).map(|&i| &self.cells[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.cells.iter().map(|(target, value)| (target.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn set(&mut self, target: String, value: V) {
        match self.index.get(&target).copied() {
            Some(i) => self.cells[i].1 = value,
            None => {
                self.index.insert(target.clone(), self.cells.len());
                self.cells.push((target, value));
            }
        }
    }
}

impl<V: Clone> Row<V> {
    pub fn get(&self, target: &str) -> Option<V> {
        self.value(target).cloned()
    }
}

impl<V: Serialize> Serialize for Row<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (target, value) in &self.cells {
            map.serialize_entry(target, value)?;
        }
        map.end()
    }
}

/// Sparse similarity matrix keyed by normalized item keys.
///
/// Absent cells mean the score was undefined or filtered out. Rows and cells
/// iterate (and serialize) in the order they were first written.
#[derive(Debug, Clone)]
pub struct Matrix<V = f64> {
    rows: Vec<Row<V>>,
    index: AHashMap<String, usize>,
}

impl<V> Default for Matrix<V> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: AHashMap::new(),
        }
    }
}

impl<V> Matrix<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>, value: V) {
        let source = source.into();
        let i = match self.index.get(&source).copied() {
            Some(i) => i,
            None => {
                let i = self.rows.len();
                self.index.insert(source.clone(), i);
                self.rows.push(Row::new(source));
                i
            }
        };
        self.rows[i].set(target.into(), value);
    }

    pub fn value(&self, source: &str, target: &str) -> Option<&V> {
        self.row(source).and_then(|row| row.value(target))
    }

    pub fn row(&self, source: &str) -> Option<&Row<V>> {
        self.index.get(source).map(|&i| &self.rows[i])
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row<V>> + '_ {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of recorded cells across all rows.
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Row::len).sum()
    }
}

impl<V: Clone> Matrix<V> {
    pub fn get(&self, source: &str, target: &str) -> Option<V> {
        self.value(source, target).cloned()
    }
}

/// Equal when both hold the same cells, regardless of insertion order.
impl<V: PartialEq> PartialEq for Matrix<V> {
    fn eq(&self, other: &Self) -> bool {
        self.cell_count() == other.cell_count()
            && self
                .rows
                .iter()
                .all(|row| row.iter().all(|(target, value)| other.value(&row.key, target) == Some(value)))
    }
}

impl<V: Serialize> Serialize for Matrix<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for row in &self.rows {
            map.serialize_entry(&row.key, row)?;
        }
        map.end()
    }
}

impl<S: Into<String>, T: Into<String>, V> FromIterator<(S, T, V)> for Matrix<V> {
    fn from_iter<It: IntoIterator<Item = (S, T, V)>>(iter: It) -> Self {
        let mut matrix = Matrix::new();
        for (source, target, value) in iter {
            matrix.insert(source, target, value);
        }
        matrix
    }
}

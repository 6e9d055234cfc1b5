//! Hierarchical positions.

use std::fmt;

/// The position of an item in a possibly nested collection: one index per
/// level, outermost first.
///
/// Paths order in pre-order: a parent sorts before its children, and siblings
/// sort by index.
///
/// ```
/// use horizon_repeater::IndexPath;
///
/// let path = IndexPath::from([2, 1]);
/// assert_eq!(path.parent(), Some(IndexPath::from_index(2)));
/// assert!(IndexPath::from_index(2) < path);
/// assert!(path < IndexPath::from_index(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath(Vec<usize>);

impl IndexPath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// A single-level path.
    pub fn from_index(index: usize) -> Self {
        Self(vec![index])
    }

    /// The empty path, addressing the root collection itself.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The index at `level`.
    pub fn get(&self, level: usize) -> Option<usize> {
        self.0.get(level).copied()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// The index within the innermost collection.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// This path extended by one level.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Self(indices)
    }

    /// This path without its last level. `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    /// Whether `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &IndexPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// The same path with the last index replaced.
    pub(crate) fn with_last(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        match indices.last_mut() {
            Some(last) => *last = index,
            None => indices.push(index),
        }
        Self(indices)
    }

    /// The same path with the index at `level` replaced.
    pub(crate) fn with_index_at(&self, level: usize, index: usize) -> Self {
        let mut indices = self.0.clone();
        if let Some(slot) = indices.get_mut(level) {
            *slot = index;
        }
        Self(indices)
    }
}

impl From<Vec<usize>> for IndexPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for IndexPath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for IndexPath {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{index}")?;
        }
        f.write_str("]")
    }
}

//! Canonical encodings of parent sets and separating sets.
//!
//! - [`ParentSetKey`]: order-independent bitset key used by the per-node
//!   statistics cache. It plays the role of the classic `Σ 2^index` encoding
//!   but grows by 64-bit words, so models are not capped at 63 variables; the
//!   only bound is `usize` node indices.
//! - [`ParentConfigurations`]: mixed-radix indexing of the joint states of a
//!   sorted parent list.
//! - [`edge_key`]: symmetric Szudzik pairing of an undirected edge.

use smallvec::SmallVec;

use crate::errors::LearnError;

const WORD_BITS: usize = 64;

/// Inline capacity for parent lists; larger sets spill to the heap.
pub(crate) const INLINE_PARENTS: usize = 8;

/// Sorted, duplicate-free list of node indices.
pub type ParentList = SmallVec<[usize; INLINE_PARENTS]>;

/// Order-independent key of a set of node indices.
///
/// Trailing zero words are never stored, so two keys are equal exactly when
/// they describe the same set, whatever order the indices were inserted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParentSetKey {
    words: SmallVec<[u64; 2]>,
}

impl ParentSetKey {
    /// The key of the empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut key = Self::empty();
        for idx in indices {
            key.insert(idx);
        }
        key
    }

    pub fn insert(&mut self, idx: usize) {
        let word = idx / WORD_BITS;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (idx % WORD_BITS);
    }

    /// A copy of this key with `idx` added.
    pub fn with(&self, idx: usize) -> Self {
        let mut key = self.clone();
        key.insert(idx);
        key
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.words
            .get(idx / WORD_BITS)
            .map(|w| w & (1u64 << (idx % WORD_BITS)) != 0)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &bits)| {
            (0..WORD_BITS)
                .filter(move |b| bits & (1u64 << b) != 0)
                .map(move |b| w * WORD_BITS + b)
        })
    }
}

/// Symmetric Szudzik pairing of an undirected edge `{a, b}`.
///
/// `edge_key(a, b) == edge_key(b, a)`, and distinct unordered pairs map to
/// distinct keys.
pub fn edge_key(a: usize, b: usize) -> u64 {
    let (lo, hi) = if a <= b { (a as u64, b as u64) } else { (b as u64, a as u64) };
    hi * hi + lo
}

/// Mixed-radix indexing of the joint states of a sorted parent list.
///
/// The first parent varies fastest. An empty parent list has exactly one
/// configuration (index 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentConfigurations {
    parents: ParentList,
    radices: SmallVec<[usize; INLINE_PARENTS]>,
    strides: SmallVec<[usize; INLINE_PARENTS]>,
    len: usize,
}

impl ParentConfigurations {
    /// `parents` must be sorted; `cardinalities` is indexed by node index.
    pub fn new(parents: &[usize], cardinalities: &[usize]) -> Result<Self, LearnError> {
        let mut radices = SmallVec::new();
        let mut strides = SmallVec::new();
        let mut len = 1usize;
        for &p in parents {
            let radix = *cardinalities.get(p).ok_or_else(|| {
                LearnError::Structure(format!("parent index {} out of range", p))
            })?;
            strides.push(len);
            radices.push(radix);
            len = len.checked_mul(radix).ok_or_else(|| {
                LearnError::Structure(format!(
                    "too many joint parent states for parent set {:?}",
                    parents
                ))
            })?;
        }

        Ok(Self {
            parents: SmallVec::from_slice(parents),
            radices,
            strides,
            len,
        })
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    /// Number of joint parent configurations.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Joint configuration index of the parents' states in an observation row.
    #[inline]
    pub fn index_of_row(&self, row: &[usize]) -> usize {
        self.parents
            .iter()
            .zip(&self.strides)
            .map(|(&p, &stride)| row[p] * stride)
            .sum()
    }

    /// State of the parent at position `pos` within configuration `idx`.
    #[inline]
    pub fn state_at(&self, idx: usize, pos: usize) -> usize {
        (idx / self.strides[pos]) % self.radices[pos]
    }

    /// Maps a configuration of this parent set onto a configuration of
    /// `subset`, whose parents must all belong to this set.
    pub fn project(&self, idx: usize, subset: &ParentConfigurations) -> Result<usize, LearnError> {
        let mut projected = 0;
        for (k, p) in subset.parents.iter().enumerate() {
            let pos = self.parents.binary_search(p).map_err(|_| {
                LearnError::Internal(format!(
                    "parent {} of {:?} is not in {:?}",
                    p, subset.parents, self.parents
                ))
            })?;
            projected += self.state_at(idx, pos) * subset.strides[k];
        }
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        let a = ParentSetKey::from_indices([1, 3]);
        let b = ParentSetKey::from_indices([3, 1]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(a.contains(3) && !a.contains(2));
    }

    #[test]
    fn key_supports_more_than_63_variables() {
        let key = ParentSetKey::from_indices([0, 63, 64, 200]);
        assert_eq!(key.indices().collect::<Vec<_>>(), vec![0, 63, 64, 200]);
        assert_ne!(key, ParentSetKey::from_indices([0, 63, 64]));
        assert_eq!(ParentSetKey::empty().with(5), ParentSetKey::from_indices([5]));
    }

    #[test]
    fn edge_key_is_symmetric_and_distinct() {
        assert_eq!(edge_key(2, 7), edge_key(7, 2));
        let mut seen = std::collections::HashSet::new();
        for a in 0..20 {
            for b in a..20 {
                assert!(seen.insert(edge_key(a, b)));
            }
        }
    }

    #[test]
    fn configurations_index_and_project() {
        // node 0: 2 states, node 2: 3 states, node 5: 2 states
        let cards = [2, 9, 3, 9, 9, 2];
        let full = ParentConfigurations::new(&[0, 2, 5], &cards).unwrap();
        assert_eq!(full.len(), 12);

        let row = [1, 0, 2, 0, 0, 1];
        let idx = full.index_of_row(&row);
        assert_eq!(idx, 1 + 2 * 2 + 6);
        assert_eq!(full.state_at(idx, 1), 2);

        let sub = ParentConfigurations::new(&[0, 5], &cards).unwrap();
        assert_eq!(full.project(idx, &sub).unwrap(), sub.index_of_row(&row));

        let none = ParentConfigurations::new(&[], &cards).unwrap();
        assert_eq!(none.len(), 1);
        assert_eq!(full.project(idx, &none).unwrap(), 0);
    }

    #[test]
    fn project_rejects_foreign_parent() {
        let cards = [2, 2, 2];
        let a = ParentConfigurations::new(&[0], &cards).unwrap();
        let b = ParentConfigurations::new(&[1], &cards).unwrap();
        assert!(a.project(0, &b).is_err());
    }
}

//! Enumeration of separating-set candidates.

use crate::model::parent_set::ParentList;

/// Iterator over the size-`k` subsets of `items`, in lexicographic order of
/// positions.
///
/// `k = 0` yields the empty subset once; `k > items.len()` yields nothing.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    items: &'a [usize],
    positions: Vec<usize>,
    done: bool,
}

impl<'a> Combinations<'a> {
    pub fn new(items: &'a [usize], k: usize) -> Self {
        Self {
            items,
            positions: (0..k).collect(),
            done: k > items.len(),
        }
    }
}

impl Iterator for Combinations<'_> {
    type Item = ParentList;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current: ParentList = self.positions.iter().map(|&p| self.items[p]).collect();

        // Advance to the next combination of positions.
        let n = self.items.len();
        let k = self.positions.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.positions[i] < n - k + i {
                self.positions[i] += 1;
                for j in i + 1..k {
                    self.positions[j] = self.positions[j - 1] + 1;
                }
                break;
            }
        }

        Some(current)
    }
}

/// Shorthand for [`Combinations::new`].
pub fn combinations(items: &[usize], k: usize) -> Combinations<'_> {
    Combinations::new(items, k)
}

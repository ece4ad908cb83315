//! Dense adjacency matrix, the single source of truth for model structure.
//!
//! `matrix.has_edge(p, c)` is `true` when `p` is a parent of `c`. Parent and
//! child lists are views derived from the matrix. The diagonal is always
//! `false`: self loops are silently ignored by [`AdjacencyMatrix::set`].

use std::collections::VecDeque;

/// Square boolean matrix indexed `[parent][child]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdjacencyMatrix {
    n: usize,
    cells: Vec<bool>,
}

impl AdjacencyMatrix {
    /// An empty graph over `n` nodes.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            cells: vec![false; n * n],
        }
    }

    /// Builds a matrix from nested rows, `rows[parent][child]`.
    ///
    /// Returns `None` if the rows are not square. Diagonal entries are dropped.
    pub fn from_rows(rows: &[Vec<bool>]) -> Option<Self> {
        let n = rows.len();
        let mut matrix = Self::new(n);
        for (p, row) in rows.iter().enumerate() {
            if row.len() != n {
                return None;
            }
            for (c, &edge) in row.iter().enumerate() {
                matrix.set(p, c, edge);
            }
        }
        Some(matrix)
    }

    /// Complete candidate graph of the feature and bridge subgraphs.
    ///
    /// Every feature may be a parent of every other feature, and every class
    /// variable may be a parent of every feature. Class variables get no
    /// parents.
    pub fn complete_candidates(is_class: &[bool]) -> Self {
        let n = is_class.len();
        let mut matrix = Self::new(n);
        for child in (0..n).filter(|&c| !is_class[c]) {
            for parent in 0..n {
                matrix.set(parent, child, true);
            }
        }
        matrix
    }

    pub fn num_nodes(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn has_edge(&self, parent: usize, child: usize) -> bool {
        self.cells[parent * self.n + child]
    }

    /// Whether `a` and `b` are connected in either direction.
    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        self.has_edge(a, b) || self.has_edge(b, a)
    }

    pub fn set(&mut self, parent: usize, child: usize, edge: bool) {
        if parent == child {
            return;
        }
        self.cells[parent * self.n + child] = edge;
    }

    pub fn add_edge(&mut self, parent: usize, child: usize) {
        self.set(parent, child, true);
    }

    pub fn remove_edge(&mut self, parent: usize, child: usize) {
        self.set(parent, child, false);
    }

    /// Parents of `child` in ascending order.
    pub fn parents_of(&self, child: usize) -> Vec<usize> {
        (0..self.n).filter(|&p| self.has_edge(p, child)).collect()
    }

    /// Children of `parent` in ascending order.
    pub fn children_of(&self, parent: usize) -> Vec<usize> {
        (0..self.n).filter(|&c| self.has_edge(parent, c)).collect()
    }

    /// Replaces the parent set (column) of `child` with the one in `other`.
    pub fn copy_parents_from(&mut self, other: &AdjacencyMatrix, child: usize) {
        for p in 0..self.n {
            self.set(p, child, other.has_edge(p, child));
        }
    }

    pub fn num_edges(&self) -> usize {
        self.cells.iter().filter(|&&e| e).count()
    }

    /// Whether every edge of `self` is also an edge of `other`.
    pub fn is_subset_of(&self, other: &AdjacencyMatrix) -> bool {
        self.n == other.n
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(&mine, &theirs)| !mine || theirs)
    }

    /// Whether a directed path `from -> ... -> to` exists.
    pub fn has_path(&self, from: usize, to: usize) -> bool {
        let mut seen = vec![false; self.n];
        let mut queue = VecDeque::from([from]);
        seen[from] = true;
        while let Some(node) = queue.pop_front() {
            if node == to {
                return true;
            }
            for next in 0..self.n {
                if self.has_edge(node, next) && !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Topological order of the subgraph induced by `nodes`, or `None` if that
    /// subgraph has a cycle.
    pub fn topological_order_among(&self, nodes: &[usize]) -> Option<Vec<usize>> {
        let mut in_degree: Vec<usize> = nodes
            .iter()
            .map(|&c| nodes.iter().filter(|&&p| self.has_edge(p, c)).count())
            .collect();
        let mut ready: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(nodes.len());

        while let Some(i) = ready.pop_front() {
            order.push(nodes[i]);
            for (j, &c) in nodes.iter().enumerate() {
                if self.has_edge(nodes[i], c) {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        ready.push_back(j);
                    }
                }
            }
        }

        (order.len() == nodes.len()).then_some(order)
    }

    pub fn topological_order(&self) -> Option<Vec<usize>> {
        let all: Vec<usize> = (0..self.n).collect();
        self.topological_order_among(&all)
    }

    pub fn is_acyclic_among(&self, nodes: &[usize]) -> bool {
        self.topological_order_among(nodes).is_some()
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_some()
    }

    /// Nested rows, `rows[parent][child]`.
    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        self.cells.chunks(self.n.max(1)).take(self.n).map(<[bool]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_stays_false() {
        let mut m = AdjacencyMatrix::new(3);
        m.add_edge(1, 1);
        assert!(!m.has_edge(1, 1));
        assert_eq!(m.num_edges(), 0);
    }

    #[test]
    fn complete_candidates_never_point_into_class_variables() {
        let m = AdjacencyMatrix::complete_candidates(&[true, true, false, false]);
        assert!(m.has_edge(0, 2) && m.has_edge(3, 2) && m.has_edge(2, 3));
        assert!(!m.has_edge(2, 0) && !m.has_edge(0, 1));
        assert_eq!(m.parents_of(2), vec![0, 1, 3]);
        assert_eq!(m.num_edges(), 6);
    }

    #[test]
    fn detects_cycles_and_orders_dags() {
        let mut m = AdjacencyMatrix::new(3);
        m.add_edge(0, 1);
        m.add_edge(1, 2);
        assert_eq!(m.topological_order(), Some(vec![0, 1, 2]));
        assert!(m.has_path(0, 2) && !m.has_path(2, 0));

        m.add_edge(2, 0);
        assert!(!m.is_acyclic());
        assert!(m.is_acyclic_among(&[0, 1]));
    }

    #[test]
    fn subset_and_round_trip_through_rows() {
        let full = AdjacencyMatrix::complete_candidates(&[false, false]);
        let mut partial = AdjacencyMatrix::new(2);
        partial.add_edge(0, 1);
        assert!(partial.is_subset_of(&full));
        assert!(!full.is_subset_of(&partial));
        assert_eq!(AdjacencyMatrix::from_rows(&partial.to_rows()), Some(partial));
        assert_eq!(AdjacencyMatrix::from_rows(&[vec![false, true]]), None);
    }
}

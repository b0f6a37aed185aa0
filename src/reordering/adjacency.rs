//! Undirected adjacency graphs extracted from sparse patterns

use crate::matrix::CsrMatrix;
use num_traits::Num;
use std::cmp::Ordering;

/// A graph in compressed adjacency form
///
/// Neighbor lists are sorted ascending. Self loops from diagonal entries are
/// kept; they do not affect coloring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    /// Number of vertices
    pub n: usize,
    /// Neighbor list offsets (size: n + 1)
    pub row_ptr: Vec<usize>,
    /// Concatenated neighbor lists
    pub adj: Vec<usize>,
}

impl Graph {
    /// Builds a graph from a CSR pattern
    ///
    /// # Arguments
    ///
    /// * `n` - Number of vertices (rows of the pattern, which must be square)
    /// * `row_ptr`, `col_idx` - Pattern with ascending columns per row
    /// * `symmetric` - The pattern is known to be structurally symmetric and is reused as is
    pub fn from_pattern(n: usize, row_ptr: &[usize], col_idx: &[usize], symmetric: bool) -> Self {
        let values = vec![1u8; col_idx.len()];
        let pattern = CsrMatrix::new(n, n, row_ptr.to_vec(), col_idx.to_vec(), values);
        Self::from_matrix(&pattern, symmetric)
    }

    /// Builds the adjacency graph of a square matrix's pattern
    ///
    /// Unless `symmetric` is set, row i of the pattern is merged with column
    /// i, giving the union of the pattern and its transpose.
    pub fn from_matrix<T: Copy + Num>(a: &CsrMatrix<T>, symmetric: bool) -> Self {
        debug_assert!(a.is_square());
        let n = a.n_rows;
        if symmetric {
            return Self {
                n,
                row_ptr: a.row_ptr.clone(),
                adj: a.col_idx.clone(),
            };
        }

        let columns = a.to_csc();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut adj = Vec::with_capacity(2 * a.nnz());
        row_ptr.push(0);

        for i in 0..n {
            merge_sorted(&a.col_idx[a.row_range(i)], columns.col_rows(i), &mut adj);
            row_ptr.push(adj.len());
        }

        Self { n, row_ptr, adj }
    }

    /// Neighbors of vertex v
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.adj[self.row_ptr[v]..self.row_ptr[v + 1]]
    }

    /// Returns true if every edge (u, v) has its reverse (v, u)
    pub fn is_symmetric(&self) -> bool {
        (0..self.n).all(|u| {
            self.neighbors(u)
                .iter()
                .all(|&v| self.neighbors(v).binary_search(&u).is_ok())
        })
    }
}

/// Appends the union of two ascending lists
fn merge_sorted(a: &[usize], b: &[usize], out: &mut Vec<usize>) {
    let (mut x, mut y) = (0, 0);
    while x < a.len() && y < b.len() {
        match a[x].cmp(&b[y]) {
            Ordering::Less => {
                out.push(a[x]);
                x += 1;
            }
            Ordering::Greater => {
                out.push(b[y]);
                y += 1;
            }
            Ordering::Equal => {
                out.push(a[x]);
                x += 1;
                y += 1;
            }
        }
    }
    out.extend_from_slice(&a[x..]);
    out.extend_from_slice(&b[y..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetrization() {
        // directed edges 0->1, 2->0, 1->2 plus diagonal
        let row_ptr = vec![0, 2, 4, 6];
        let col_idx = vec![0, 1, 1, 2, 0, 2];
        let g = Graph::from_pattern(3, &row_ptr, &col_idx, false);

        assert_eq!(g.neighbors(0), &[0, 1, 2]);
        assert_eq!(g.neighbors(1), &[0, 1, 2]);
        assert_eq!(g.neighbors(2), &[0, 1, 2]);
        assert!(g.is_symmetric());
    }

    #[test]
    fn test_matrix_graph_is_union_with_transpose() {
        //    [2 1 0 0]
        //    [0 2 0 1]
        //    [0 0 2 0]
        //    [1 0 1 2]
        let a = CsrMatrix::from_triplets(
            4,
            4,
            &[(0, 0, 2.0), (0, 1, 1.0), (1, 1, 2.0), (1, 3, 1.0), (2, 2, 2.0), (3, 0, 1.0), (3, 2, 1.0), (3, 3, 2.0)],
        );
        let g = Graph::from_matrix(&a, false);

        assert_eq!(g.neighbors(0), &[0, 1, 3]);
        assert_eq!(g.neighbors(1), &[0, 1, 3]);
        assert_eq!(g.neighbors(2), &[2, 3]);
        assert_eq!(g.neighbors(3), &[0, 1, 2, 3]);
        assert_eq!(g, Graph::from_matrix(&a.transpose(), false));
    }

    #[test]
    fn test_merge_sorted() {
        let mut out = Vec::new();
        merge_sorted(&[0, 2, 5], &[1, 2, 7, 9], &mut out);
        assert_eq!(out, vec![0, 1, 2, 5, 7, 9]);
    }

    #[test]
    fn test_symmetric_pattern_reused() {
        let row_ptr = vec![0, 2, 4];
        let col_idx = vec![0, 1, 0, 1];
        let g = Graph::from_pattern(2, &row_ptr, &col_idx, true);
        assert_eq!(g.row_ptr, row_ptr);
        assert_eq!(g.adj, col_idx);
    }

    #[test]
    fn test_one_sided_pattern_is_not_symmetric() {
        let g = Graph::from_pattern(2, &[0, 2, 3], &[0, 1, 1], true);
        assert!(!g.is_symmetric());
        assert!(Graph::from_pattern(2, &[0, 2, 3], &[0, 1, 1], false).is_symmetric());
    }
}

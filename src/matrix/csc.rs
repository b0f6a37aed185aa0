//! Column-compressed view of a CSR matrix
//!
//! Only produced by [`CsrMatrix::to_csc`](crate::CsrMatrix::to_csc). Read
//! column by column it is the row view of the transpose, which is what the
//! symmetric expansion and the adjacency symmetrization consume.

use num_traits::Num;
use std::ops::Range;

/// A sparse matrix in Compressed Sparse Column (CSC) format
///
/// Row indices are ascending within every column.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T> {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Number of columns in the matrix
    pub n_cols: usize,

    /// Column pointers (size: n_cols + 1)
    pub col_ptr: Vec<usize>,

    /// Row indices (size: nnz)
    pub row_idx: Vec<usize>,

    /// Non-zero values (size: nnz)
    pub values: Vec<T>,
}

impl<T: Copy + Num> CscMatrix<T> {
    /// Creates a CSC matrix from raw arrays
    ///
    /// # Panics
    ///
    /// Panics if `col_ptr` does not have `n_cols + 1` entries closing at the
    /// entry count, or if a row index is out of range.
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(col_ptr.len(), n_cols + 1, "col_ptr.len() must be n_cols + 1");
        assert_eq!(col_ptr[n_cols], row_idx.len(), "col_ptr must close at nnz");
        assert_eq!(row_idx.len(), values.len(), "row_idx and values differ in length");
        assert!(row_idx.iter().all(|&r| r < n_rows), "row index out of range");

        Self { n_rows, n_cols, col_ptr, row_idx, values }
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Positions of column j in `row_idx` and `values`
    #[inline]
    pub fn col_range(&self, j: usize) -> Range<usize> {
        self.col_ptr[j]..self.col_ptr[j + 1]
    }

    /// Rows holding an entry in column j, ascending
    #[inline]
    pub fn col_rows(&self, j: usize) -> &[usize] {
        &self.row_idx[self.col_range(j)]
    }
}

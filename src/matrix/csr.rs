//! Compressed Sparse Row (CSR) matrix format implementation

use num_traits::Num;
use std::fmt;

use crate::constants::{MAX_DISPLAY_ELEMENTS_PER_ROW, MAX_DISPLAY_ROWS};
use crate::error::{Result, StructuralError};

/// A sparse matrix in Compressed Sparse Row (CSR) format
///
/// The CSR format stores a sparse matrix using three arrays:
/// - row_ptr: Array of size n_rows + 1 containing indices into col_idx and values arrays
/// - col_idx: Array of size nnz containing column indices of non-zero elements
/// - values: Array of size nnz containing the non-zero values
///
/// Within each row the column indices are strictly ascending. Factorization
/// and triangular solves additionally require a diagonal entry in every row,
/// see [`CsrMatrix::check_structure`].
#[derive(Clone, PartialEq)]
pub struct CsrMatrix<T> {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Number of columns in the matrix
    pub n_cols: usize,

    /// Row pointers (size: n_rows + 1)
    /// row_ptr[i] is the index in col_idx and values where row i starts
    /// row_ptr[n_rows] is equal to nnz
    pub row_ptr: Vec<usize>,

    /// Column indices (size: nnz)
    pub col_idx: Vec<usize>,

    /// Non-zero values (size: nnz)
    pub values: Vec<T>,
}

impl<T> CsrMatrix<T>
where
    T: Copy + Num,
{
    /// Creates a new CSR matrix with the given dimensions and data
    ///
    /// # Arguments
    ///
    /// * `n_rows` - Number of rows
    /// * `n_cols` - Number of columns
    /// * `row_ptr` - Row pointers
    /// * `col_idx` - Column indices
    /// * `values` - Non-zero values
    ///
    /// # Panics
    ///
    /// Panics if the input arrays are inconsistent:
    /// - row_ptr.len() must be n_rows + 1
    /// - col_idx.len() must equal values.len()
    /// - row_ptr[n_rows] must equal col_idx.len()
    ///
    /// Use [`CsrMatrix::try_new`] for a fallible constructor that also checks
    /// the column ordering.
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(row_ptr.len(), n_rows + 1, "row_ptr.len() must be n_rows + 1");
        assert_eq!(col_idx.len(), values.len(), "col_idx.len() must equal values.len()");
        assert_eq!(
            row_ptr[n_rows],
            col_idx.len(),
            "row_ptr[n_rows] must equal col_idx.len()"
        );

        for &col in &col_idx {
            assert!(col < n_cols, "Column index {} out of bounds (n_cols = {})", col, n_cols);
        }

        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Creates a CSR matrix after validating every CSR invariant
    ///
    /// Besides the buffer lengths this checks that row pointers are
    /// non-decreasing and that each row's column indices are strictly
    /// ascending and in bounds.
    pub fn try_new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        if row_ptr.len() != n_rows + 1 {
            return Err(StructuralError::MalformedCsr(format!(
                "row_ptr has length {}, expected {}",
                row_ptr.len(),
                n_rows + 1
            ))
            .into());
        }
        if col_idx.len() != values.len() {
            return Err(StructuralError::MalformedCsr(format!(
                "col_idx has length {} but values has length {}",
                col_idx.len(),
                values.len()
            ))
            .into());
        }
        if row_ptr[0] != 0 || row_ptr[n_rows] != col_idx.len() {
            return Err(StructuralError::MalformedCsr(
                "row_ptr must start at 0 and end at nnz".to_string(),
            )
            .into());
        }

        for i in 0..n_rows {
            let (start, end) = (row_ptr[i], row_ptr[i + 1]);
            if start > end {
                return Err(StructuralError::MalformedCsr(format!(
                    "row_ptr decreases at row {}",
                    i
                ))
                .into());
            }
            for idx in start..end {
                if col_idx[idx] >= n_cols {
                    return Err(StructuralError::MalformedCsr(format!(
                        "column index {} out of bounds in row {}",
                        col_idx[idx], i
                    ))
                    .into());
                }
                if idx > start && col_idx[idx - 1] >= col_idx[idx] {
                    return Err(StructuralError::UnsortedRow { row: i }.into());
                }
            }
        }

        Ok(Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Returns the number of non-zero elements in the matrix
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the matrix has as many rows as columns
    pub fn is_square(&self) -> bool {
        self.n_rows == self.n_cols
    }

    /// Returns the storage range of row i
    #[inline]
    pub fn row_range(&self, i: usize) -> std::ops::Range<usize> {
        self.row_ptr[i]..self.row_ptr[i + 1]
    }

    /// Returns an iterator over the non-zero elements in row i
    ///
    /// Each item is a tuple (col_idx, value) representing a non-zero element
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, &T)> {
        assert!(i < self.n_rows, "Row index out of bounds");

        let range = self.row_range(i);

        self.col_idx[range.clone()]
            .iter()
            .zip(&self.values[range])
            .map(|(&col, val)| (col, val))
    }

    /// Returns the storage position of entry (row, col), if present
    pub fn find(&self, row: usize, col: usize) -> Option<usize> {
        let range = self.row_range(row);
        self.col_idx[range.clone()]
            .binary_search(&col)
            .ok()
            .map(|offset| range.start + offset)
    }

    /// Returns the value stored at (row, col), or zero if the entry is absent
    pub fn get(&self, row: usize, col: usize) -> T {
        self.find(row, col).map_or(T::zero(), |pos| self.values[pos])
    }

    /// Creates an empty matrix with the given dimensions
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_ptr: vec![0; n_rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates an identity matrix of the given size
    pub fn identity(n: usize) -> Self {
        Self::from_diagonal(&vec![T::one(); n])
    }

    /// Creates a square diagonal matrix holding `diag`
    pub fn from_diagonal(diag: &[T]) -> Self {
        let n = diag.len();
        Self {
            n_rows: n,
            n_cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: diag.to_vec(),
        }
    }

    /// Builds a CSR matrix from (row, col, value) triplets
    ///
    /// Duplicate coordinates are summed and each row is sorted by column.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, T)]) -> Self {
        let mut rows: Vec<Vec<(usize, T)>> = vec![Vec::new(); n_rows];
        for &(r, c, v) in triplets {
            assert!(r < n_rows && c < n_cols, "Triplet ({}, {}) out of bounds", r, c);
            rows[r].push((c, v));
        }

        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        row_ptr.push(0);

        for mut row in rows {
            row.sort_by_key(|&(c, _)| c);
            for (c, v) in row {
                match col_idx.last() {
                    Some(&last) if last == c && values.len() > row_ptr[row_ptr.len() - 1] => {
                        let tail = values.len() - 1;
                        values[tail] = values[tail] + v;
                    }
                    _ => {
                        col_idx.push(c);
                        values.push(v);
                    }
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self::new(n_rows, n_cols, row_ptr, col_idx, values)
    }

    /// Returns the matrix as a dense row-major table, for tests and debugging
    pub fn to_dense(&self) -> Vec<Vec<T>> {
        let mut dense = vec![vec![T::zero(); self.n_cols]; self.n_rows];
        for i in 0..self.n_rows {
            for (j, &v) in self.row_iter(i) {
                dense[i][j] = v;
            }
        }
        dense
    }
}

impl<T: fmt::Debug + Copy + Num> fmt::Debug for CsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CsrMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  nnz: {}", self.nnz())?;

        let max_rows_to_print = MAX_DISPLAY_ROWS.min(self.n_rows);

        if max_rows_to_print > 0 {
            writeln!(f, "  content sample:")?;

            for i in 0..max_rows_to_print {
                write!(f, "    row {}: ", i)?;
                let start = self.row_ptr[i];
                let end = self.row_ptr[i + 1];

                if start == end {
                    writeln!(f, "(empty)")?;
                } else {
                    let max_elements = MAX_DISPLAY_ELEMENTS_PER_ROW.min(end - start);

                    for j in start..(start + max_elements) {
                        write!(f, "({}, {:?}) ", self.col_idx[j], self.values[j])?;
                    }

                    if end - start > max_elements {
                        write!(f, "... ({} more)", end - start - max_elements)?;
                    }

                    writeln!(f)?;
                }
            }

            if self.n_rows > max_rows_to_print {
                writeln!(f, "    ... ({} more rows)", self.n_rows - max_rows_to_print)?;
            }
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;

    #[test]
    fn test_new_matrix() {
        let matrix = CsrMatrix::new(
            3, 3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1, 2, 3, 4, 5],
        );

        assert_eq!(matrix.n_rows, 3);
        assert_eq!(matrix.n_cols, 3);
        assert_eq!(matrix.nnz(), 5);
    }

    #[test]
    fn test_row_iter() {
        let matrix = CsrMatrix::new(
            3, 3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1, 2, 3, 4, 5],
        );

        let row0: Vec<_> = matrix.row_iter(0).collect();
        assert_eq!(row0, vec![(0, &1), (1, &2)]);

        let row2: Vec<_> = matrix.row_iter(2).collect();
        assert_eq!(row2, vec![(0, &4), (2, &5)]);
    }

    #[test]
    fn test_find_and_get() {
        let matrix = CsrMatrix::new(
            3, 3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        );

        assert_eq!(matrix.find(2, 2), Some(4));
        assert_eq!(matrix.find(1, 0), None);
        assert_eq!(matrix.get(0, 1), 2.0);
        assert_eq!(matrix.get(1, 2), 0.0);
    }

    #[test]
    fn test_identity() {
        let identity = CsrMatrix::<i32>::identity(3);

        assert_eq!(identity.row_ptr, vec![0, 1, 2, 3]);
        assert_eq!(identity.col_idx, vec![0, 1, 2]);
        assert_eq!(identity.values, vec![1, 1, 1]);
    }

    #[test]
    fn test_from_triplets_sums_duplicates() {
        let m = CsrMatrix::from_triplets(
            2,
            2,
            &[(1, 1, 1.0), (0, 1, 2.0), (1, 1, 3.0), (0, 0, 5.0)],
        );
        assert_eq!(m.row_ptr, vec![0, 2, 3]);
        assert_eq!(m.col_idx, vec![0, 1, 1]);
        assert_eq!(m.values, vec![5.0, 2.0, 4.0]);
    }

    #[test]
    fn test_try_new_rejects_unsorted_row() {
        let result = CsrMatrix::try_new(2, 2, vec![0, 2, 3], vec![1, 0, 1], vec![1.0, 2.0, 3.0]);
        assert_eq!(
            result.unwrap_err(),
            SolverError::Structural(StructuralError::UnsortedRow { row: 0 })
        );
    }

    #[test]
    fn test_try_new_rejects_bad_row_ptr() {
        let result = CsrMatrix::try_new(2, 2, vec![0, 2], vec![0, 1], vec![1.0, 2.0]);
        assert!(matches!(
            result,
            Err(SolverError::Structural(StructuralError::MalformedCsr(_)))
        ));
    }

    #[test]
    #[should_panic(expected = "row_ptr.len() must be n_rows + 1")]
    fn test_invalid_row_ptr() {
        CsrMatrix::new(
            3, 3,
            vec![0, 2, 3], // Missing last element
            vec![0, 1, 1, 0, 2],
            vec![1, 2, 3, 4, 5],
        );
    }

    #[test]
    #[should_panic(expected = "col_idx.len() must equal values.len()")]
    fn test_inconsistent_lengths() {
        CsrMatrix::new(
            3, 3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1, 2, 3, 4], // Missing last element
        );
    }
}

//! Structural utilities on CSR matrices
//!
//! Zero removal, diagonal checks, padding to a block-aligned size,
//! symmetric expansion and row scaling. Each of these is an exact
//! transformation of the index layout apart from the explicit zero
//! dropping of [`CsrMatrix::remove_zeros`] and the synthetic rows added by
//! [`CsrMatrix::padding`].

use log::debug;

use crate::error::{Result, SolverError, StructuralError};
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;

impl<T: Scalar> CsrMatrix<T> {
    /// Drops every stored entry whose value is exactly zero
    ///
    /// Returns the number of entries removed.
    pub fn remove_zeros(&mut self) -> usize {
        let mut write = 0;
        let mut start = self.row_ptr[0];

        for i in 0..self.n_rows {
            let end = self.row_ptr[i + 1];
            for read in start..end {
                if self.values[read] == T::zero() {
                    continue;
                }
                self.values[write] = self.values[read];
                self.col_idx[write] = self.col_idx[read];
                write += 1;
            }
            start = end;
            self.row_ptr[i + 1] = write;
        }

        let removed = self.values.len() - write;
        self.values.truncate(write);
        self.col_idx.truncate(write);
        if removed > 0 {
            debug!("remove_zeros: dropped {} explicit zeros, nnz now {}", removed, write);
        }
        removed
    }

    /// Position of the diagonal entry of row i, if stored
    #[inline]
    pub fn diagonal_position(&self, i: usize) -> Option<usize> {
        self.find(i, i)
    }

    /// Verifies that the matrix is square and every row stores its diagonal
    ///
    /// # Returns
    ///
    /// `MissingDiagonal` for the first row without a diagonal entry
    pub fn check_structure(&self) -> Result<()> {
        if !self.is_square() {
            return Err(SolverError::DimensionMismatch {
                expected: self.n_rows,
                got: self.n_cols,
            });
        }
        for i in 0..self.n_rows {
            if self.diagonal_position(i).is_none() {
                return Err(StructuralError::MissingDiagonal { row: i }.into());
            }
        }
        Ok(())
    }

    /// Extracts the diagonal as a dense vector
    pub fn diagonal(&self) -> Result<Vec<T>> {
        (0..self.n_rows)
            .map(|i| {
                self.diagonal_position(i)
                    .map(|pos| self.values[pos])
                    .ok_or_else(|| StructuralError::MissingDiagonal { row: i }.into())
            })
            .collect()
    }

    /// Extracts the diagonal and replaces every entry by its inverse
    pub fn inverted_diagonal(&self) -> Result<Vec<T>> {
        let mut diag = self.diagonal()?;
        invert_in_place(&mut diag)?;
        Ok(diag)
    }

    /// Pads the matrix so that its dimension becomes a multiple of `size`
    ///
    /// Each synthetic row i holds a single entry (i, i) = 1, so the padded
    /// system decouples from the original one.
    ///
    /// # Returns
    ///
    /// The number of rows added
    pub fn padding(&mut self, size: usize) -> Result<usize> {
        if size == 0 {
            return Err(SolverError::config("padding size must be at least 1"));
        }
        if !self.is_square() {
            return Err(SolverError::DimensionMismatch {
                expected: self.n_rows,
                got: self.n_cols,
            });
        }

        let remain = match self.n_rows % size {
            0 => 0,
            r => size - r,
        };

        let nnz = self.nnz();
        self.values.reserve(remain);
        self.col_idx.reserve(remain);
        self.row_ptr.reserve(remain);
        for k in 0..remain {
            self.values.push(T::one());
            self.col_idx.push(self.n_rows + k);
            self.row_ptr.push(nnz + k + 1);
        }
        self.n_rows += remain;
        self.n_cols += remain;

        if remain > 0 {
            debug!("padding: added {} rows, n = {}", remain, self.n_rows);
        }
        Ok(remain)
    }

    /// Rebuilds a full matrix from its stored lower half
    ///
    /// `self` holds the lower triangle including the diagonal of a
    /// symmetric matrix. The result carries every off-diagonal value at both
    /// (i, j) and (j, i), with the diagonal counted once.
    pub fn expand(&self) -> Result<Self> {
        self.check_structure()?;

        let n = self.n_rows;
        let upper = self.to_csc();
        let nnz = 2 * self.nnz() - n;

        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);

        for i in 0..n {
            for idx in self.row_range(i) {
                if self.col_idx[idx] > i {
                    return Err(StructuralError::MalformedCsr(format!(
                        "row {} stores an upper entry in a lower half",
                        i
                    ))
                    .into());
                }
                col_idx.push(self.col_idx[idx]);
                values.push(self.values[idx]);
            }
            // column i of the lower half is row i of the upper half; its
            // first entry is the diagonal, already emitted above
            for idx in upper.col_range(i).skip(1) {
                col_idx.push(upper.row_idx[idx]);
                values.push(upper.values[idx]);
            }
            row_ptr.push(col_idx.len());
        }

        Ok(Self::new(n, n, row_ptr, col_idx, values))
    }

    /// Deep copy of the matrix
    ///
    /// Factorizations work in place, so callers keep the original through a
    /// duplicate.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Divides each row of the system by its largest absolute value
    ///
    /// The same factor is applied to the matching entry of `b`.
    pub fn scale_rows(&mut self, b: &mut [T]) -> Result<()> {
        crate::error::check_len(self.n_rows, b.len())?;

        for i in 0..self.n_rows {
            let range = self.row_range(i);
            let max = self.values[range.clone()]
                .iter()
                .fold(T::zero(), |acc, v| acc.max(v.abs()));
            if max == T::zero() {
                continue;
            }
            for v in &mut self.values[range] {
                *v /= max;
            }
            b[i] /= max;
        }
        Ok(())
    }
}

/// Replaces every entry of `diag` by its inverse
pub(crate) fn invert_in_place<T: Scalar>(diag: &mut [T]) -> Result<()> {
    for (row, d) in diag.iter_mut().enumerate() {
        if *d == T::zero() {
            return Err(SolverError::ZeroPivot { row });
        }
        *d = d.recip();
    }
    Ok(())
}

/// Extends a vector with zeros up to `n` entries
///
/// Used for right-hand sides and iterates after [`CsrMatrix::padding`].
pub fn pad_vector<T: Scalar>(v: &[T], n: usize) -> Vec<T> {
    let mut padded = v.to_vec();
    if padded.len() < n {
        padded.resize(n, T::zero());
    }
    padded
}

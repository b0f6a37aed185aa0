//! Conversion functions between matrix formats

use log::debug;
use num_traits::Num;

use crate::error::{Result, SolverError, StructuralError};
use crate::matrix::{BcsrMatrix, CscMatrix, CsrMatrix, SellMatrix};
use crate::utils::exclusive_scan;

impl<T: Copy + Num> CsrMatrix<T> {
    /// Converts this CSR matrix to CSC format
    ///
    /// Row indices come out ascending within each column.
    pub fn to_csc(&self) -> CscMatrix<T> {
        // Count non-zeros per column
        let mut col_counts = vec![0; self.n_cols];
        for &col in &self.col_idx {
            col_counts[col] += 1;
        }

        let col_ptr = exclusive_scan(&col_counts);

        let nnz = self.nnz();
        let mut row_idx = vec![0; nnz];
        let mut values = vec![T::zero(); nnz];
        let mut next = col_ptr.clone();

        for i in 0..self.n_rows {
            for idx in self.row_range(i) {
                let col = self.col_idx[idx];
                let pos = next[col];

                row_idx[pos] = i;
                values[pos] = self.values[idx];

                next[col] += 1;
            }
        }

        CscMatrix::new(self.n_rows, self.n_cols, col_ptr, row_idx, values)
    }

    /// Returns the transpose as a CSR matrix
    pub fn transpose(&self) -> CsrMatrix<T> {
        let csc = self.to_csc();
        CsrMatrix::new(csc.n_cols, csc.n_rows, csc.col_ptr, csc.row_idx, csc.values)
    }

    /// Converts this CSR matrix to BCSR with `bnl × bnw` blocks
    ///
    /// A block is stored whenever at least one of its positions holds an
    /// entry; the remaining positions are zero-filled.
    ///
    /// # Returns
    ///
    /// `BlockSizeMismatch` if `bnl` does not divide the row count or `bnw`
    /// does not divide the column count
    pub fn to_bcsr(&self, bnl: usize, bnw: usize) -> Result<BcsrMatrix<T>> {
        if bnl == 0 || bnw == 0 {
            return Err(SolverError::config("block dimensions must be positive"));
        }
        if self.n_rows % bnl != 0 {
            return Err(StructuralError::BlockSizeMismatch { n: self.n_rows, block: bnl }.into());
        }
        if self.n_cols % bnw != 0 {
            return Err(StructuralError::BlockSizeMismatch { n: self.n_cols, block: bnw }.into());
        }

        let n_block_rows = self.n_rows / bnl;
        let bs = bnl * bnw;

        // block row of the last visit for every block column
        let mut seen = vec![usize::MAX; self.n_cols / bnw];
        let mut block_row_ptr = Vec::with_capacity(n_block_rows + 1);
        let mut block_col_idx = Vec::new();
        block_row_ptr.push(0);

        let mut row_blocks = Vec::new();
        for bi in 0..n_block_rows {
            row_blocks.clear();
            for i in bi * bnl..(bi + 1) * bnl {
                for idx in self.row_range(i) {
                    let bj = self.col_idx[idx] / bnw;
                    if seen[bj] != bi {
                        seen[bj] = bi;
                        row_blocks.push(bj);
                    }
                }
            }
            row_blocks.sort_unstable();
            block_col_idx.extend_from_slice(&row_blocks);
            block_row_ptr.push(block_col_idx.len());
        }

        let mut values = vec![T::zero(); block_col_idx.len() * bs];
        for bi in 0..n_block_rows {
            let blocks = &block_col_idx[block_row_ptr[bi]..block_row_ptr[bi + 1]];
            for r in 0..bnl {
                let i = bi * bnl + r;
                // both sequences ascend, so one cursor walks the block list
                let mut cursor = 0;
                for idx in self.row_range(i) {
                    let col = self.col_idx[idx];
                    while blocks[cursor] != col / bnw {
                        cursor += 1;
                    }
                    let b = block_row_ptr[bi] + cursor;
                    values[b * bs + (col % bnw) * bnl + r] = self.values[idx];
                }
            }
        }

        debug!(
            "to_bcsr: {}x{} blocks, nnz {} -> {} blocks ({} stored)",
            bnl,
            bnw,
            self.nnz(),
            block_col_idx.len(),
            values.len()
        );

        Ok(BcsrMatrix::new(
            self.n_rows,
            self.n_cols,
            bnl,
            bnw,
            block_row_ptr,
            block_col_idx,
            values,
        ))
    }

    /// Converts this CSR matrix to SELL-C with slice height `c`
    pub fn to_sell(&self, c: usize) -> Result<SellMatrix<T>> {
        if c == 0 {
            return Err(SolverError::config("slice height must be at least 1"));
        }

        let n_slices = (self.n_rows + c - 1) / c;
        let mut slice_ptr = Vec::with_capacity(n_slices + 1);
        slice_ptr.push(0);
        for s in 0..n_slices {
            let rows = s * c..(s * c + c).min(self.n_rows);
            let width = rows
                .map(|i| self.row_ptr[i + 1] - self.row_ptr[i])
                .max()
                .unwrap_or(0);
            slice_ptr.push(slice_ptr[s] + width);
        }

        let stored: usize = (0..n_slices)
            .map(|s| (slice_ptr[s + 1] - slice_ptr[s]) * c.min(self.n_rows - s * c))
            .sum();
        let mut col_idx = vec![0; stored];
        let mut values = vec![T::zero(); stored];

        for s in 0..n_slices {
            let height = c.min(self.n_rows - s * c);
            let base = slice_ptr[s] * c;
            for j in 0..height {
                let i = s * c + j;
                for (k, idx) in self.row_range(i).enumerate() {
                    col_idx[base + k * height + j] = self.col_idx[idx];
                    values[base + k * height + j] = self.values[idx];
                }
            }
        }

        Ok(SellMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            slice_height: c,
            slice_ptr,
            col_idx,
            values,
        })
    }
}

impl<T: Copy + Num> CscMatrix<T> {
    /// Converts this CSC matrix to CSR format
    pub fn to_csr(&self) -> CsrMatrix<T> {
        // Count non-zeros per row
        let mut row_counts = vec![0; self.n_rows];
        for &row in &self.row_idx {
            row_counts[row] += 1;
        }

        let row_ptr = exclusive_scan(&row_counts);

        let nnz = self.nnz();
        let mut col_idx = vec![0; nnz];
        let mut values = vec![T::zero(); nnz];
        let mut next = row_ptr.clone();

        for j in 0..self.n_cols {
            for idx in self.col_ptr[j]..self.col_ptr[j + 1] {
                let row = self.row_idx[idx];
                let pos = next[row];

                col_idx[pos] = j;
                values[pos] = self.values[idx];

                next[row] += 1;
            }
        }

        CsrMatrix::new(self.n_rows, self.n_cols, row_ptr, col_idx, values)
    }
}

impl<T: Copy + Num> BcsrMatrix<T> {
    /// Expands every stored block back into scalar CSR entries
    ///
    /// All `bnl × bnw` positions of a stored block are emitted, including
    /// zero-filled ones. Running [`CsrMatrix::remove_zeros`] on the result
    /// restores the pattern of a zero-free source matrix.
    pub fn to_csr(&self) -> CsrMatrix<T> {
        let (bnl, bnw) = (self.bnl, self.bnw);
        let bs = self.block_size();

        let mut row_ptr = Vec::with_capacity(self.n_rows + 1);
        let mut col_idx = Vec::with_capacity(self.stored_len());
        let mut values = Vec::with_capacity(self.stored_len());
        row_ptr.push(0);

        for i in 0..self.n_rows {
            let bi = i / bnl;
            let r = i % bnl;
            for b in self.block_row_ptr[bi]..self.block_row_ptr[bi + 1] {
                let col_base = self.block_col_idx[b] * bnw;
                for c in 0..bnw {
                    col_idx.push(col_base + c);
                    values.push(self.values[b * bs + c * bnl + r]);
                }
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix::new(self.n_rows, self.n_cols, row_ptr, col_idx, values)
    }
}

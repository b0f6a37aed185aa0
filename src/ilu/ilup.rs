//! ILU(p): incomplete LU with level-of-fill control
//!
//! Every entry carries the level at which it was introduced: original
//! entries have level 0, and eliminating row i against pivot row k gives an
//! entry (i, j) the level `lev(i, k) + lev(k, j) + 1`, or the minimum with
//! its current level if it already exists. Entries above level p are
//! dropped when row i is committed.

use log::debug;
use std::mem;

use crate::error::{Result, SolverError, StructuralError};
use crate::ilu::fill_row::FillRow;
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;

/// Factor rows committed so far, with their fill levels
struct CommittedRows<T> {
    row_ptr: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
    levels: Vec<usize>,
}

impl<T: Scalar> CommittedRows<T> {
    fn diagonal(&self, k: usize) -> Result<usize> {
        let start = self.row_ptr[k];
        self.cols[start..self.row_ptr[k + 1]]
            .binary_search(&k)
            .map(|offset| start + offset)
            .map_err(|_| StructuralError::MissingDiagonal { row: k }.into())
    }

    fn commit(&mut self, row: &FillRow<T>, p: usize) {
        for (v, lev, c) in row.iter() {
            if lev <= p {
                self.values.push(v);
                self.levels.push(lev);
                self.cols.push(c);
            }
        }
        self.row_ptr.push(self.cols.len());
    }
}

/// Eliminates the entry at `pos` of `work` against committed pivot row k
///
/// Writes the updated row into `merged`: entries before `pos` are copied,
/// the multiplier replaces the eliminated entry, and the tail is merged with
/// the upper part of row k.
fn eliminate<T: Scalar>(
    work: &FillRow<T>,
    pos: usize,
    factor: &CommittedRows<T>,
    merged: &mut FillRow<T>,
) -> Result<()> {
    let k = work.col(pos);
    let diag = factor.diagonal(k)?;
    let pivot_value = factor.values[diag];
    if pivot_value == T::zero() {
        return Err(SolverError::ZeroPivot { row: k });
    }

    let multiplier = work.value(pos) / pivot_value;
    let pivot_lev = work.level(pos);

    merged.clear();
    merged.extend_from(work, pos);
    merged.push(multiplier, pivot_lev, k);

    let mut a = pos + 1;
    let mut b = diag + 1;
    let b_end = factor.row_ptr[k + 1];

    while a < work.len() || b < b_end {
        let col_a = if a < work.len() { work.col(a) } else { usize::MAX };
        let col_b = if b < b_end { factor.cols[b] } else { usize::MAX };

        if col_a < col_b {
            merged.push(work.value(a), work.level(a), col_a);
            a += 1;
        } else if col_a == col_b {
            let value = work.value(a) - multiplier * factor.values[b];
            let level = work.level(a).min(pivot_lev + factor.levels[b] + 1);
            merged.push(value, level, col_a);
            a += 1;
            b += 1;
        } else {
            let value = -(multiplier * factor.values[b]);
            merged.push(value, pivot_lev + factor.levels[b] + 1, col_b);
            b += 1;
        }
    }
    Ok(())
}

/// Factorizes `a` with fill level `p`, replacing it by the combined L\U factor
///
/// The factor stores L (strict lower, unit diagonal implied) and U in one
/// CSR matrix whose pattern is the level-p pattern of `a`. For `p = 0` the
/// result equals [`crate::ilu::ilu0`].
///
/// # Returns
///
/// `MissingDiagonal` if a pivot row lacks its diagonal, `ZeroPivot` if a
/// pivot is exactly zero.
pub fn ilup<T: Scalar>(a: &mut CsrMatrix<T>, p: usize) -> Result<()> {
    a.check_structure()?;

    let n = a.n_rows;
    let nnz_before = a.nnz();
    let mut factor = CommittedRows {
        row_ptr: Vec::with_capacity(n + 1),
        cols: Vec::with_capacity(nnz_before),
        values: Vec::with_capacity(nnz_before),
        levels: Vec::with_capacity(nnz_before),
    };
    factor.row_ptr.push(0);

    let mut work = FillRow::new();
    let mut merged = FillRow::new();

    for i in 0..n {
        let range = a.row_range(i);
        work.clear();
        work.extend_at_level(&a.values[range.clone()], &a.col_idx[range], 0);

        let mut pos = 0;
        while pos < work.len() && work.col(pos) < i {
            if work.level(pos) <= p {
                eliminate(&work, pos, &factor, &mut merged)?;
                mem::swap(&mut work, &mut merged);
            }
            pos += 1;
        }

        factor.commit(&work, p);
    }

    debug!(
        "ilup: p = {}, n = {}, nnz {} -> {}",
        p,
        n,
        nnz_before,
        factor.cols.len()
    );

    *a = CsrMatrix::new(n, n, factor.row_ptr, factor.cols, factor.values);
    Ok(())
}

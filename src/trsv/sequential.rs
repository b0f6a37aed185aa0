//! Sequential sparse triangular solves on CSR factors
//!
//! L is unit lower triangular with the unit diagonal not stored. U is upper
//! triangular with its diagonal stored inverted as the first entry of every
//! row, which is the layout an `L-DU` split with inversion produces.

use crate::error::{check_len, Result, StructuralError};
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;

/// Checks that `l` holds only strictly lower entries
pub fn validate_unit_lower<T: Scalar>(l: &CsrMatrix<T>) -> Result<()> {
    for i in 0..l.n_rows {
        if let Some(&last) = l.col_idx[l.row_range(i)].last() {
            if last >= i {
                return Err(StructuralError::MalformedCsr(format!(
                    "row {} of a unit lower factor stores column {}",
                    i, last
                ))
                .into());
            }
        }
    }
    Ok(())
}

/// Checks that every row of `u` opens with its diagonal and continues to the right
pub fn validate_upper<T: Scalar>(u: &CsrMatrix<T>) -> Result<()> {
    for i in 0..u.n_rows {
        let range = u.row_range(i);
        if range.is_empty() || u.col_idx[range.start] != i {
            if u.col_idx[range].first().map_or(false, |&j| j < i) {
                return Err(StructuralError::MalformedCsr(format!(
                    "row {} of an upper factor stores a lower entry",
                    i
                ))
                .into());
            }
            return Err(StructuralError::MissingDiagonal { row: i }.into());
        }
    }
    Ok(())
}

/// Forward substitution y ← L⁻¹ y, in place
pub fn lower_solve_in_place<T: Scalar>(l: &CsrMatrix<T>, y: &mut [T]) -> Result<()> {
    check_len(l.n_rows, y.len())?;

    for i in 0..l.n_rows {
        let mut t = y[i];
        for idx in l.row_range(i) {
            t -= l.values[idx] * y[l.col_idx[idx]];
        }
        y[i] = t;
    }
    Ok(())
}

/// Backward substitution y ← U⁻¹ y, in place
///
/// Multiplies by the stored inverse diagonal instead of dividing.
pub fn upper_solve_in_place<T: Scalar>(u: &CsrMatrix<T>, y: &mut [T]) -> Result<()> {
    check_len(u.n_rows, y.len())?;

    for i in (0..u.n_rows).rev() {
        let range = u.row_range(i);
        let mut t = y[i];
        for idx in (range.start + 1..range.end).rev() {
            t -= u.values[idx] * y[u.col_idx[idx]];
        }
        y[i] = t * u.values[range.start];
    }
    Ok(())
}

/// Solves L y = x
pub fn lower_solve<T: Scalar>(l: &CsrMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
    check_len(l.n_rows, x.len())?;
    check_len(l.n_rows, y.len())?;
    y.copy_from_slice(x);
    lower_solve_in_place(l, y)
}

/// Solves U y = x
pub fn upper_solve<T: Scalar>(u: &CsrMatrix<T>, x: &[T], y: &mut [T]) -> Result<()> {
    check_len(u.n_rows, x.len())?;
    check_len(u.n_rows, y.len())?;
    y.copy_from_slice(x);
    upper_solve_in_place(u, y)
}

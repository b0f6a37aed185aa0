//! In-place ILU(0) factorization

use log::debug;

use crate::error::{Result, SolverError, StructuralError};
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;

/// Factorizes `a` in place into L (strict lower, unit diagonal implied) and U
///
/// The nonzero pattern is fixed: updates only touch entries already present
/// in row i, so the factor has exactly the pattern of the input. On return
/// the strictly lower entries hold the multipliers of L and the remaining
/// entries hold U.
///
/// # Returns
///
/// `MissingDiagonal` if a row lacks its diagonal, `ZeroPivot` if a pivot
/// used for elimination is exactly zero. No shift or perturbation is tried.
pub fn ilu0<T: Scalar>(a: &mut CsrMatrix<T>) -> Result<()> {
    a.check_structure()?;

    let n = a.n_rows;
    for i in 1..n {
        let row = a.row_range(i);

        for k in row.clone() {
            let kc = a.col_idx[k];
            if kc >= i {
                break;
            }

            let pivot_pos = a
                .diagonal_position(kc)
                .ok_or(StructuralError::MissingDiagonal { row: kc })?;
            let pivot = a.values[pivot_pos];
            if pivot == T::zero() {
                return Err(SolverError::ZeroPivot { row: kc });
            }
            let multiplier = a.values[k] / pivot;
            a.values[k] = multiplier;

            // walk row i (after k) and the upper part of row kc together
            let pivot_row_end = a.row_ptr[kc + 1];
            let mut p = pivot_pos + 1;
            for j in k + 1..row.end {
                let col = a.col_idx[j];
                while p < pivot_row_end && a.col_idx[p] < col {
                    p += 1;
                }
                if p == pivot_row_end {
                    break;
                }
                if a.col_idx[p] == col {
                    let update = multiplier * a.values[p];
                    a.values[j] -= update;
                    p += 1;
                }
            }
        }
    }

    debug!("ilu0: n = {}, nnz = {}", n, a.nnz());
    Ok(())
}

//! Small dense kernels on `ndarray` storage

use ndarray::Array2;

use crate::error::{Result, SolverError};
use crate::scalar::Scalar;

/// Solves the leading `m × m` upper-triangular system U x = b
///
/// Only the upper triangle of the leading block of `u` is read, so the
/// rotated Hessenberg matrix of GMRES can be passed as is.
///
/// # Returns
///
/// `ZeroPivot` if a diagonal entry of the leading block vanishes
pub fn upper_trsv<T: Scalar>(u: &Array2<T>, b: &[T], x: &mut [T], m: usize) -> Result<()> {
    debug_assert!(u.nrows() >= m && u.ncols() >= m);
    debug_assert!(b.len() >= m && x.len() >= m);

    for i in (0..m).rev() {
        let mut t = b[i];
        for j in (i + 1..m).rev() {
            t -= u[[i, j]] * x[j];
        }
        let d = u[[i, i]];
        if d == T::zero() {
            return Err(SolverError::ZeroPivot { row: i });
        }
        x[i] = t / d;
    }
    Ok(())
}

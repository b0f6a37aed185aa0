//! Utilities for converting between our matrix formats and sprs
//!
//! sprs serves as an independent reference for products and transposes in
//! the test suites.

use num_traits::Num;
use sprs::CsMat;

use crate::matrix::{CscMatrix, CsrMatrix};

/// Converts our CSR matrix format to sprs CsMat format
pub fn to_sprs_csr<T>(matrix: &CsrMatrix<T>) -> CsMat<T>
where
    T: Copy + Num + Default,
{
    CsMat::new(
        (matrix.n_rows, matrix.n_cols),
        matrix.row_ptr.clone(),
        matrix.col_idx.clone(),
        matrix.values.clone(),
    )
}

/// Converts our CSC matrix format to sprs CsMat format (as CSC)
pub fn to_sprs_csc<T>(matrix: &CscMatrix<T>) -> CsMat<T>
where
    T: Copy + Num + Default,
{
    CsMat::new_csc(
        (matrix.n_rows, matrix.n_cols),
        matrix.col_ptr.clone(),
        matrix.row_idx.clone(),
        matrix.values.clone(),
    )
}

/// Converts sprs CsMat to our CSR format, converting storage if needed
pub fn from_sprs_csr<T>(matrix: CsMat<T>) -> CsrMatrix<T>
where
    T: Copy + Num + Default,
{
    let matrix = if matrix.is_csr() {
        matrix
    } else {
        matrix.to_csr()
    };

    let shape = matrix.shape();
    let (indptr, indices, data) = matrix.into_raw_storage();

    CsrMatrix::new(shape.0, shape.1, indptr, indices, data)
}

/// Computes y = A x by walking the rows of the sprs copy
pub fn sprs_spmv(matrix: &CsrMatrix<f64>, x: &[f64]) -> Vec<f64> {
    let a = to_sprs_csr(matrix);
    a.outer_iterator()
        .map(|row| row.iter().map(|(j, &v)| v * x[j]).sum::<f64>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_roundtrip() {
        let original = CsrMatrix::new(
            3, 3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1.0f64, 2.0, 3.0, 4.0, 5.0],
        );

        let roundtrip = from_sprs_csr(to_sprs_csr(&original));

        assert_eq!(roundtrip, original);
    }

    #[test]
    fn test_transpose_matches_sprs() {
        let csr = CsrMatrix::new(
            3, 4,
            vec![0, 2, 3, 5],
            vec![0, 3, 1, 0, 2],
            vec![1.0f64, 2.0, 3.0, 4.0, 5.0],
        );

        let ours = csr.to_csc();
        let theirs = to_sprs_csr(&csr).to_csc();

        assert_eq!(theirs.indptr().as_slice().unwrap(), ours.col_ptr.as_slice());
        assert_eq!(theirs.indices(), ours.row_idx.as_slice());
        assert_eq!(theirs.data(), ours.values.as_slice());
        assert_eq!(to_sprs_csc(&ours).to_csr(), to_sprs_csr(&csr));
    }

    #[test]
    fn test_sprs_spmv() {
        let csr = CsrMatrix::new(
            3, 3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1.0f64, 2.0, 3.0, 4.0, 5.0],
        );
        let y = sprs_spmv(&csr, &[1.0, 1.0, 2.0]);
        assert_eq!(y, vec![3.0, 3.0, 14.0]);
    }
}

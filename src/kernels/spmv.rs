//! Sparse matrix-vector products
//!
//! Rows are independent, so each product runs row-parallel with rayon once
//! the row count reaches [`PARALLEL_SPMV_THRESHOLD`].

use rayon::prelude::*;

use crate::constants::PARALLEL_SPMV_THRESHOLD;
use crate::error::{check_len, Result};
use crate::matrix::{BcsrMatrix, CsrMatrix, SellMatrix};
use crate::scalar::Scalar;

impl<T: Scalar> CsrMatrix<T> {
    #[inline]
    fn row_dot(&self, i: usize, x: &[T]) -> T {
        let range = self.row_range(i);
        self.col_idx[range.clone()]
            .iter()
            .zip(&self.values[range])
            .fold(T::zero(), |acc, (&j, &v)| acc + v * x[j])
    }

    /// Computes y = A x
    pub fn spmv(&self, x: &[T], y: &mut [T]) -> Result<()> {
        check_len(self.n_cols, x.len())?;
        check_len(self.n_rows, y.len())?;

        if self.n_rows >= PARALLEL_SPMV_THRESHOLD {
            y.par_iter_mut()
                .enumerate()
                .for_each(|(i, yi)| *yi = self.row_dot(i, x));
        } else {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = self.row_dot(i, x);
            }
        }
        Ok(())
    }

    /// Computes y = (A + diag(d)) x
    ///
    /// Consumes the off-diagonal buffer and separate diagonal of an `LU-D`
    /// split without reassembling the matrix.
    pub fn spmv_with_diag(&self, d: &[T], x: &[T], y: &mut [T]) -> Result<()> {
        check_len(self.n_cols, x.len())?;
        check_len(self.n_rows, y.len())?;
        check_len(self.n_rows, d.len())?;

        let row = |i: usize| x[i] * d[i] + self.row_dot(i, x);
        if self.n_rows >= PARALLEL_SPMV_THRESHOLD {
            y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = row(i));
        } else {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = row(i);
            }
        }
        Ok(())
    }

    /// Computes r = b − A x
    pub fn residual(&self, b: &[T], x: &[T], r: &mut [T]) -> Result<()> {
        check_len(self.n_rows, b.len())?;
        self.spmv(x, r)?;
        for (ri, &bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        Ok(())
    }
}

impl<T: Scalar> BcsrMatrix<T> {
    fn block_row_product(&self, bi: usize, x: &[T], y: &mut [T]) {
        let (bnl, bnw) = (self.bnl, self.bnw);
        y.iter_mut().for_each(|v| *v = T::zero());
        for b in self.block_row_ptr[bi]..self.block_row_ptr[bi + 1] {
            let block = self.block(b);
            let x_base = self.block_col_idx[b] * bnw;
            for c in 0..bnw {
                let xc = x[x_base + c];
                let column = &block[c * bnl..(c + 1) * bnl];
                for (yr, &v) in y.iter_mut().zip(column) {
                    *yr += v * xc;
                }
            }
        }
    }

    /// Computes y = A x one block row at a time
    pub fn spmv(&self, x: &[T], y: &mut [T]) -> Result<()> {
        check_len(self.n_cols, x.len())?;
        check_len(self.n_rows, y.len())?;

        if self.n_rows >= PARALLEL_SPMV_THRESHOLD {
            y.par_chunks_mut(self.bnl)
                .enumerate()
                .for_each(|(bi, yb)| self.block_row_product(bi, x, yb));
        } else {
            for (bi, yb) in y.chunks_mut(self.bnl).enumerate() {
                self.block_row_product(bi, x, yb);
            }
        }
        Ok(())
    }
}

impl<T: Scalar> SellMatrix<T> {
    fn slice_product(&self, s: usize, x: &[T], y: &mut [T]) {
        let height = self.slice_rows(s);
        let base = self.slice_ptr[s] * self.slice_height;
        y.iter_mut().for_each(|v| *v = T::zero());
        for k in 0..self.slice_width(s) {
            let off = base + k * height;
            for (j, yj) in y.iter_mut().enumerate() {
                *yj += self.values[off + j] * x[self.col_idx[off + j]];
            }
        }
    }

    /// Computes y = A x one slice at a time
    pub fn spmv(&self, x: &[T], y: &mut [T]) -> Result<()> {
        check_len(self.n_cols, x.len())?;
        check_len(self.n_rows, y.len())?;

        if self.n_rows >= PARALLEL_SPMV_THRESHOLD {
            y.par_chunks_mut(self.slice_height)
                .enumerate()
                .for_each(|(s, ys)| self.slice_product(s, x, ys));
        } else {
            for (s, ys) in y.chunks_mut(self.slice_height).enumerate() {
                self.slice_product(s, x, ys);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;

    fn sample() -> CsrMatrix<f64> {
        //    [1 2 0 0]
        //    [0 3 0 0]
        //    [4 0 5 0]
        //    [0 0 6 7]
        CsrMatrix::new(
            4, 4,
            vec![0, 2, 3, 5, 7],
            vec![0, 1, 1, 0, 2, 2, 3],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
        )
    }

    #[test]
    fn test_csr_spmv() {
        let mut y = vec![0.0; 4];
        sample().spmv(&[1.0, 1.0, 1.0, 1.0], &mut y).unwrap();
        assert_eq!(y, vec![3.0, 3.0, 9.0, 13.0]);
    }

    #[test]
    fn test_spmv_dimension_mismatch() {
        let mut y = vec![0.0; 4];
        assert_eq!(
            sample().spmv(&[1.0, 1.0], &mut y),
            Err(SolverError::DimensionMismatch { expected: 4, got: 2 })
        );
    }

    #[test]
    fn test_spmv_with_diag() {
        let lu = CsrMatrix::new(2, 2, vec![0, 1, 2], vec![1, 0], vec![2.0, 3.0]);
        let mut y = vec![0.0; 2];
        lu.spmv_with_diag(&[1.0, 4.0], &[1.0, 2.0], &mut y).unwrap();
        assert_eq!(y, vec![5.0, 11.0]);
    }

    #[test]
    fn test_residual() {
        let mut r = vec![0.0; 4];
        sample()
            .residual(&[3.0, 3.0, 9.0, 13.0], &[1.0, 1.0, 1.0, 1.0], &mut r)
            .unwrap();
        assert_eq!(r, vec![0.0; 4]);
    }

    #[test]
    fn test_bcsr_and_sell_match_csr() {
        let a = sample();
        let x = [1.0, -2.0, 0.5, 3.0];
        let mut expected = vec![0.0; 4];
        a.spmv(&x, &mut expected).unwrap();

        for (bnl, bnw) in [(2, 2), (4, 1), (2, 1), (1, 1)] {
            let mut y = vec![0.0; 4];
            a.to_bcsr(bnl, bnw).unwrap().spmv(&x, &mut y).unwrap();
            assert_eq!(y, expected, "bcsr {}x{}", bnl, bnw);
        }

        for c in [1, 3, 4, 8] {
            let mut y = vec![0.0; 4];
            a.to_sell(c).unwrap().spmv(&x, &mut y).unwrap();
            assert_eq!(y, expected, "sell-{}", c);
        }
    }
}

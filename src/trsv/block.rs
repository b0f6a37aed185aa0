//! Triangular solves on BCSR factors
//!
//! The kernels work one block row at a time. A block row reads already
//! solved entries from a `solved` slice and updates its own `bnl` entries in
//! `own`, so the same kernels serve the sequential sweep and the
//! color-parallel schedule.
//!
//! The block shape is a runtime property of [`BcsrMatrix`], but the hot
//! loops are written against `bnl`/`bnw` arguments and inlined into
//! const-generic entry points for the common shapes, which lets the compiler
//! unroll and vectorize the inner loops. Other shapes take the runtime path.

use crate::error::{check_len, Result, SolverError, StructuralError};
use crate::matrix::BcsrMatrix;
use crate::scalar::Scalar;

/// Where already solved entries live relative to the block row being solved
#[derive(Clone, Copy)]
pub(crate) struct Solved<'a, T> {
    pub values: &'a [T],
    pub offset: usize,
}

impl<'a, T: Copy> Solved<'a, T> {
    #[inline(always)]
    fn get(&self, col: usize) -> T {
        self.values[col - self.offset]
    }
}

/// Forward substitution of block row `bi` of a unit-lower BCSR factor
///
/// Blocks must be sorted by column; the diagonal band comes last and holds
/// only strictly lower values.
#[inline(always)]
pub(crate) fn lower_block_row<T: Scalar>(
    l: &BcsrMatrix<T>,
    bi: usize,
    bnl: usize,
    bnw: usize,
    solved: Solved<'_, T>,
    own: &mut [T],
) {
    let bs = bnl * bnw;
    let own_start = bi * bnl;

    for b in l.block_row_ptr[bi]..l.block_row_ptr[bi + 1] {
        let block = &l.values[b * bs..(b + 1) * bs];
        let x_base = l.block_col_idx[b] * bnw;
        for c in 0..bnw {
            let col = x_base + c;
            let yc = if col >= own_start {
                own[col - own_start]
            } else {
                solved.get(col)
            };
            let column = &block[c * bnl..(c + 1) * bnl];
            for k in 0..bnl {
                own[k] -= column[k] * yc;
            }
        }
    }
}

/// Backward substitution of block row `bi` of an upper BCSR factor
///
/// The first `bnl / bnw` blocks of the row form the diagonal band and carry
/// the inverted diagonal; the remaining blocks lie strictly to the right.
#[inline(always)]
pub(crate) fn upper_block_row<T: Scalar>(
    u: &BcsrMatrix<T>,
    bi: usize,
    bnl: usize,
    bnw: usize,
    solved: Solved<'_, T>,
    own: &mut [T],
) {
    let bs = bnl * bnw;
    let band = bnl / bnw;
    let start = u.block_row_ptr[bi];

    for b in (start + band..u.block_row_ptr[bi + 1]).rev() {
        let block = &u.values[b * bs..(b + 1) * bs];
        let x_base = u.block_col_idx[b] * bnw;
        for c in 0..bnw {
            let yc = solved.get(x_base + c);
            let column = &block[c * bnl..(c + 1) * bnl];
            for k in 0..bnl {
                own[k] -= column[k] * yc;
            }
        }
    }

    for t in (0..band).rev() {
        let block = &u.values[(start + t) * bs..(start + t + 1) * bs];
        for c in (0..bnw).rev() {
            let column = &block[c * bnl..(c + 1) * bnl];
            let idx = t * bnw + c;
            own[idx] *= column[idx];
            let yc = own[idx];
            for k in (0..idx).rev() {
                own[k] -= column[k] * yc;
            }
        }
    }
}

#[inline(always)]
fn lower_sweep<T: Scalar>(l: &BcsrMatrix<T>, y: &mut [T], bnl: usize, bnw: usize) {
    for bi in 0..l.n_block_rows() {
        let (head, tail) = y.split_at_mut(bi * bnl);
        let solved = Solved { values: head, offset: 0 };
        lower_block_row(l, bi, bnl, bnw, solved, &mut tail[..bnl]);
    }
}

#[inline(always)]
fn upper_sweep<T: Scalar>(u: &BcsrMatrix<T>, y: &mut [T], bnl: usize, bnw: usize) {
    for bi in (0..u.n_block_rows()).rev() {
        let (head, tail) = y.split_at_mut((bi + 1) * bnl);
        let solved = Solved {
            values: tail,
            offset: (bi + 1) * bnl,
        };
        upper_block_row(u, bi, bnl, bnw, solved, &mut head[bi * bnl..]);
    }
}

/// Forward substitution specialized for a `BNL × BNW` block shape
pub fn lower_solve_fixed<T: Scalar, const BNL: usize, const BNW: usize>(
    l: &BcsrMatrix<T>,
    y: &mut [T],
) -> Result<()> {
    check_shape(l, BNL, BNW)?;
    check_len(l.n_rows, y.len())?;
    lower_sweep(l, y, BNL, BNW);
    Ok(())
}

/// Backward substitution specialized for a `BNL × BNW` block shape
pub fn upper_solve_fixed<T: Scalar, const BNL: usize, const BNW: usize>(
    u: &BcsrMatrix<T>,
    y: &mut [T],
) -> Result<()> {
    check_shape(u, BNL, BNW)?;
    check_len(u.n_rows, y.len())?;
    upper_sweep(u, y, BNL, BNW);
    Ok(())
}

fn check_shape<T: Scalar>(m: &BcsrMatrix<T>, bnl: usize, bnw: usize) -> Result<()> {
    if m.bnl != bnl || m.bnw != bnw {
        return Err(SolverError::config(format!(
            "kernel for {}x{} blocks called on {}x{} blocks",
            bnl, bnw, m.bnl, m.bnw
        )));
    }
    Ok(())
}

macro_rules! dispatch_block_shape {
    ($m:expr, $y:expr, $fixed:ident, $sweep:ident) => {
        match ($m.bnl, $m.bnw) {
            (1, 1) => $fixed::<T, 1, 1>($m, $y),
            (2, 1) => $fixed::<T, 2, 1>($m, $y),
            (2, 2) => $fixed::<T, 2, 2>($m, $y),
            (4, 1) => $fixed::<T, 4, 1>($m, $y),
            (4, 2) => $fixed::<T, 4, 2>($m, $y),
            (4, 4) => $fixed::<T, 4, 4>($m, $y),
            (8, 1) => $fixed::<T, 8, 1>($m, $y),
            (8, 2) => $fixed::<T, 8, 2>($m, $y),
            (8, 4) => $fixed::<T, 8, 4>($m, $y),
            (8, 8) => $fixed::<T, 8, 8>($m, $y),
            (16, 1) => $fixed::<T, 16, 1>($m, $y),
            (bnl, bnw) => {
                check_len($m.n_rows, $y.len())?;
                $sweep($m, $y, bnl, bnw);
                Ok(())
            }
        }
    };
}

/// Forward substitution y ← L⁻¹ y on a unit-lower BCSR factor, in place
pub fn lower_solve_in_place<T: Scalar>(l: &BcsrMatrix<T>, y: &mut [T]) -> Result<()> {
    dispatch_block_shape!(l, y, lower_solve_fixed, lower_sweep)
}

/// Backward substitution y ← U⁻¹ y on an upper BCSR factor, in place
pub fn upper_solve_in_place<T: Scalar>(u: &BcsrMatrix<T>, y: &mut [T]) -> Result<()> {
    dispatch_block_shape!(u, y, upper_solve_fixed, upper_sweep)
}

/// Checks the block shape constraints of a BCSR triangular factor
///
/// The block height must be a multiple of the block width, so that the
/// diagonal band of a block row is made of whole blocks. For an upper
/// factor the band must be stored in full at the start of every block row.
pub fn validate_block_factor<T: Scalar>(m: &BcsrMatrix<T>, upper: bool) -> Result<()> {
    if m.n_rows != m.n_cols {
        return Err(SolverError::DimensionMismatch {
            expected: m.n_rows,
            got: m.n_cols,
        });
    }
    if m.bnl % m.bnw != 0 {
        return Err(SolverError::config(format!(
            "block height {} is not a multiple of block width {}",
            m.bnl, m.bnw
        )));
    }
    if !upper {
        return Ok(());
    }

    let band = m.bnl / m.bnw;
    for bi in 0..m.n_block_rows() {
        let blocks = &m.block_col_idx[m.block_row_ptr[bi]..m.block_row_ptr[bi + 1]];
        let first = bi * band;
        let complete = blocks.len() >= band
            && blocks[..band].iter().enumerate().all(|(t, &bj)| bj == first + t);
        if !complete {
            return Err(StructuralError::MissingDiagonal { row: bi * m.bnl }.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::split;
    use crate::config::SplitPolicy;
    use crate::matrix::CsrMatrix;
    use crate::trsv::sequential;

    fn factors(n: usize) -> (CsrMatrix<f64>, CsrMatrix<f64>) {
        // dense-ish banded matrix, split into unit L and inverted-diagonal U
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 4.0 + i as f64));
            for d in 1..4 {
                if i >= d {
                    triplets.push((i, i - d, 0.5 / d as f64));
                }
                if i + d < n {
                    triplets.push((i, i + d, -0.25 * d as f64));
                }
            }
        }
        let a = CsrMatrix::from_triplets(n, n, &triplets);
        split(&a, SplitPolicy::LDu, true).unwrap().into_l_du().unwrap()
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-12, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_block_solves_match_csr() {
        let n = 16;
        let (l, u) = factors(n);
        let rhs: Vec<f64> = (0..n).map(|i| 1.0 + (i % 5) as f64).collect();

        let mut expected_l = rhs.clone();
        sequential::lower_solve_in_place(&l, &mut expected_l).unwrap();
        let mut expected_u = rhs.clone();
        sequential::upper_solve_in_place(&u, &mut expected_u).unwrap();

        // fixed shapes plus the runtime fallback for 16x8
        for (bnl, bnw) in [(1, 1), (2, 1), (4, 2), (8, 1), (8, 4), (16, 8), (4, 4)] {
            let bl = l.to_bcsr(bnl, bnw).unwrap();
            let bu = u.to_bcsr(bnl, bnw).unwrap();
            validate_block_factor(&bl, false).unwrap();
            validate_block_factor(&bu, true).unwrap();

            let mut y = rhs.clone();
            lower_solve_in_place(&bl, &mut y).unwrap();
            assert_close(&y, &expected_l);

            let mut y = rhs.clone();
            upper_solve_in_place(&bu, &mut y).unwrap();
            assert_close(&y, &expected_u);
        }
    }

    #[test]
    fn test_runtime_shape() {
        let n = 12;
        let (l, u) = factors(n);
        let rhs = vec![1.0; n];

        let mut expected = rhs.clone();
        sequential::lower_solve_in_place(&l, &mut expected).unwrap();
        sequential::upper_solve_in_place(&u, &mut expected).unwrap();

        let bl = l.to_bcsr(6, 3).unwrap();
        let bu = u.to_bcsr(6, 3).unwrap();
        let mut y = rhs.clone();
        lower_solve_in_place(&bl, &mut y).unwrap();
        upper_solve_in_place(&bu, &mut y).unwrap();
        assert_close(&y, &expected);
    }

    #[test]
    fn test_fixed_shape_mismatch() {
        let (l, _) = factors(8);
        let bl = l.to_bcsr(4, 1).unwrap();
        let mut y = vec![0.0; 8];
        assert!(matches!(
            lower_solve_fixed::<f64, 8, 1>(&bl, &mut y),
            Err(SolverError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_uneven_block_shape() {
        let (l, _) = factors(8);
        let bl = l.to_bcsr(2, 4).unwrap();
        assert!(matches!(
            validate_block_factor(&bl, false),
            Err(SolverError::InvalidConfiguration(_))
        ));
    }
}

//! Color-grouping permutations and their application to matrices and vectors

use rayon::prelude::*;

use crate::constants::PARALLEL_VECTOR_THRESHOLD;
use crate::error::{check_len, Result, StructuralError};
use crate::matrix::CsrMatrix;
use crate::reordering::blocking::Blocking;
use crate::reordering::coloring::Coloring;
use crate::scalar::Scalar;
use crate::trsv::ColorSchedule;
use crate::utils::invert_permutation;

/// Symmetric permutation grouping rows of equal color
///
/// `lp[new] = old` and `rp[old] = new`. Rows of color c occupy the new range
/// `boundaries[c]..boundaries[c + 1]`, which is cut into units of `unit`
/// rows that do not depend on each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    lp: Vec<usize>,
    rp: Vec<usize>,
    boundaries: Vec<usize>,
    unit: usize,
}

impl Permutation {
    /// Identity ordering with one color
    pub fn identity(n: usize) -> Self {
        Self {
            lp: (0..n).collect(),
            rp: (0..n).collect(),
            boundaries: vec![0, n],
            unit: 1,
        }
    }

    /// Row-wise multi-coloring: vertices grouped by color, index order inside
    pub fn amc(coloring: &Coloring) -> Self {
        let n = coloring.colors.len();
        let sizes = coloring.color_sizes();
        let mut boundaries = Vec::with_capacity(coloring.n_colors + 1);
        boundaries.push(0);
        for s in &sizes {
            boundaries.push(boundaries[boundaries.len() - 1] + s);
        }

        let mut next = boundaries.clone();
        let mut lp = vec![0; n];
        for (v, &c) in coloring.colors.iter().enumerate() {
            lp[next[c - 1]] = v;
            next[c - 1] += 1;
        }
        let rp = invert_permutation(&lp);

        Self {
            lp,
            rp,
            boundaries,
            unit: 1,
        }
    }

    /// Block multi-coloring: blocks grouped by color, each expanded to its
    /// member rows in place
    ///
    /// # Arguments
    ///
    /// * `blocking` - Partition of the rows into equal blocks
    /// * `block_coloring` - Coloring of the block graph
    pub fn abmc(blocking: &Blocking, block_coloring: &Coloring) -> Result<Self> {
        let n_blocks = blocking.n_blocks();
        if block_coloring.colors.len() != n_blocks {
            return Err(StructuralError::BlockSizeMismatch {
                n: blocking.members.len(),
                block: blocking.block_size,
            }
            .into());
        }

        let block_order = Self::amc(block_coloring);
        let bs = blocking.block_size;
        let mut lp = Vec::with_capacity(blocking.members.len());
        for &b in &block_order.lp {
            lp.extend_from_slice(blocking.block(b));
        }
        let rp = invert_permutation(&lp);
        let boundaries = block_order.boundaries.iter().map(|&b| b * bs).collect();

        Ok(Self {
            lp,
            rp,
            boundaries,
            unit: bs,
        })
    }

    /// Number of permuted rows
    pub fn len(&self) -> usize {
        self.lp.len()
    }

    /// Returns true if the permutation covers no rows
    pub fn is_empty(&self) -> bool {
        self.lp.is_empty()
    }

    /// Number of colors
    pub fn n_colors(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// New-to-old index map
    pub fn lp(&self) -> &[usize] {
        &self.lp
    }

    /// Old-to-new index map
    pub fn rp(&self) -> &[usize] {
        &self.rp
    }

    /// Rows per independent unit
    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Color ranges for the triangular solves on the permuted matrix
    pub fn schedule(&self) -> Result<ColorSchedule> {
        ColorSchedule::new(self.boundaries.clone(), self.unit)
    }

    /// Applies the permutation symmetrically: returns P A Pᵀ
    ///
    /// Row `new` of the result is row `lp[new]` of `a` with every column
    /// renamed through `rp` and re-sorted.
    pub fn permute_matrix<T: Scalar>(&self, a: &CsrMatrix<T>) -> Result<CsrMatrix<T>> {
        check_len(self.len(), a.n_rows)?;
        check_len(self.len(), a.n_cols)?;

        let n = self.len();
        let mut row_ptr = Vec::with_capacity(n + 1);
        row_ptr.push(0);
        for &old in &self.lp {
            row_ptr.push(row_ptr[row_ptr.len() - 1] + a.row_range(old).len());
        }

        let mut col_idx = vec![0; a.nnz()];
        let mut values = vec![T::zero(); a.nnz()];
        let mut entries: Vec<(usize, T)> = Vec::new();

        for (new, &old) in self.lp.iter().enumerate() {
            entries.clear();
            entries.extend(a.row_iter(old).map(|(c, &v)| (self.rp[c], v)));
            entries.sort_unstable_by_key(|&(c, _)| c);

            let start = row_ptr[new];
            for (k, &(c, v)) in entries.iter().enumerate() {
                col_idx[start + k] = c;
                values[start + k] = v;
            }
        }

        Ok(CsrMatrix::new(n, n, row_ptr, col_idx, values))
    }

    /// Gathers a vector into the new order: `out[new] = v[lp[new]]`
    pub fn permute_vector<T: Scalar>(&self, v: &[T], out: &mut [T]) -> Result<()> {
        check_len(self.len(), v.len())?;
        check_len(self.len(), out.len())?;
        if out.len() >= PARALLEL_VECTOR_THRESHOLD {
            out.par_iter_mut()
                .zip(self.lp.par_iter())
                .for_each(|(o, &old)| *o = v[old]);
        } else {
            for (o, &old) in out.iter_mut().zip(&self.lp) {
                *o = v[old];
            }
        }
        Ok(())
    }

    /// Scatters a vector back to the original order: `out[lp[new]] = v[new]`
    pub fn unpermute_vector<T: Scalar>(&self, v: &[T], out: &mut [T]) -> Result<()> {
        check_len(self.len(), v.len())?;
        check_len(self.len(), out.len())?;
        if out.len() >= PARALLEL_VECTOR_THRESHOLD {
            out.par_iter_mut()
                .zip(self.rp.par_iter())
                .for_each(|(o, &new)| *o = v[new]);
        } else {
            for (o, &new) in out.iter_mut().zip(&self.rp) {
                *o = v[new];
            }
        }
        Ok(())
    }
}

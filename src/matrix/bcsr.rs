//! Block Compressed Sparse Row (BCSR) matrix format implementation

use aligned_vec::AVec;
use num_traits::Num;
use std::fmt;

use crate::constants::BLOCK_VALUE_ALIGN;

/// A sparse matrix stored as dense `bnl × bnw` blocks
///
/// Block rows and block columns follow CSR semantics at block granularity:
/// - block_row_ptr: size n_rows / bnl + 1
/// - block_col_idx: block column of each stored block, ascending per block row
/// - values: bnl * bnw values per block, column-major inside the block
///
/// Entry (r, c) of block `b` therefore lives at `values[b * bnl * bnw + c * bnl + r]`.
/// Block positions without an original entry hold an exact zero.
#[derive(Clone)]
pub struct BcsrMatrix<T> {
    /// Number of scalar rows
    pub n_rows: usize,

    /// Number of scalar columns
    pub n_cols: usize,

    /// Block height
    pub bnl: usize,

    /// Block width
    pub bnw: usize,

    /// Block row pointers (size: n_rows / bnl + 1)
    pub block_row_ptr: Vec<usize>,

    /// Block column indices (size: number of blocks)
    pub block_col_idx: Vec<usize>,

    /// Block values, cache-line aligned
    pub values: AVec<T>,
}

impl<T> BcsrMatrix<T>
where
    T: Copy + Num,
{
    /// Creates a BCSR matrix from raw block buffers
    ///
    /// # Panics
    ///
    /// Panics if the buffers are inconsistent with the block shape:
    /// - bnl must divide n_rows and bnw must divide n_cols
    /// - block_row_ptr.len() must be n_rows / bnl + 1
    /// - values.len() must be n_blocks * bnl * bnw
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        bnl: usize,
        bnw: usize,
        block_row_ptr: Vec<usize>,
        block_col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert!(bnl > 0 && bnw > 0, "block dimensions must be positive");
        assert_eq!(n_rows % bnl, 0, "bnl must divide n_rows");
        assert_eq!(n_cols % bnw, 0, "bnw must divide n_cols");
        assert_eq!(
            block_row_ptr.len(),
            n_rows / bnl + 1,
            "block_row_ptr.len() must be n_rows / bnl + 1"
        );
        assert_eq!(
            block_row_ptr[n_rows / bnl],
            block_col_idx.len(),
            "block_row_ptr[n_block_rows] must equal the number of blocks"
        );
        assert_eq!(
            values.len(),
            block_col_idx.len() * bnl * bnw,
            "values.len() must be n_blocks * bnl * bnw"
        );

        Self {
            n_rows,
            n_cols,
            bnl,
            bnw,
            block_row_ptr,
            block_col_idx,
            values: AVec::from_iter(BLOCK_VALUE_ALIGN, values),
        }
    }

    /// Number of block rows
    pub fn n_block_rows(&self) -> usize {
        self.n_rows / self.bnl
    }

    /// Number of stored blocks
    pub fn n_blocks(&self) -> usize {
        self.block_col_idx.len()
    }

    /// Number of stored scalars, explicit zeros included
    pub fn stored_len(&self) -> usize {
        self.values.len()
    }

    /// Scalars per block
    #[inline]
    pub fn block_size(&self) -> usize {
        self.bnl * self.bnw
    }

    /// Returns the column-major values of block `b`
    #[inline]
    pub fn block(&self, b: usize) -> &[T] {
        let bs = self.block_size();
        &self.values[b * bs..(b + 1) * bs]
    }

    /// Returns the value at scalar position (row, col), or zero if absent
    pub fn get(&self, row: usize, col: usize) -> T {
        let bi = row / self.bnl;
        let bj = col / self.bnw;
        let range = self.block_row_ptr[bi]..self.block_row_ptr[bi + 1];
        match self.block_col_idx[range.clone()].binary_search(&bj) {
            Ok(offset) => {
                let b = range.start + offset;
                self.block(b)[(col % self.bnw) * self.bnl + row % self.bnl]
            }
            Err(_) => T::zero(),
        }
    }
}

impl<T: fmt::Debug + Copy + Num> fmt::Debug for BcsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BcsrMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  block shape: {} × {}", self.bnl, self.bnw)?;
        writeln!(f, "  blocks: {}", self.n_blocks())?;
        write!(f, "}}")
    }
}

//! Sliced ELLPACK (SELL-C) matrix format

use num_traits::Num;
use std::fmt;

/// A sparse matrix in SELL-C format
///
/// Rows are grouped into slices of `slice_height` consecutive rows (the last
/// slice may be shorter). Every row of a slice is padded to the width of the
/// slice's longest row, and the slice is stored column by column so that the
/// k-th entries of all its rows are contiguous:
///
/// entry k of row j in slice s lives at `slice_ptr[s] * slice_height + k * h_s + j`,
/// where `h_s` is the height of slice s. Padding entries are zero and point at
/// column 0.
#[derive(Clone, PartialEq)]
pub struct SellMatrix<T> {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Number of columns in the matrix
    pub n_cols: usize,

    /// Rows per slice
    pub slice_height: usize,

    /// Cumulative slice widths (size: n_slices + 1)
    pub slice_ptr: Vec<usize>,

    /// Column indices, padded
    pub col_idx: Vec<usize>,

    /// Values, padded with zeros
    pub values: Vec<T>,
}

impl<T: Copy + Num> SellMatrix<T> {
    /// Number of slices
    pub fn n_slices(&self) -> usize {
        self.slice_ptr.len() - 1
    }

    /// Height of slice s
    #[inline]
    pub fn slice_rows(&self, s: usize) -> usize {
        let start = s * self.slice_height;
        self.slice_height.min(self.n_rows - start)
    }

    /// Width of slice s
    #[inline]
    pub fn slice_width(&self, s: usize) -> usize {
        self.slice_ptr[s + 1] - self.slice_ptr[s]
    }

    /// Number of stored values including padding
    pub fn stored_len(&self) -> usize {
        self.values.len()
    }
}

impl<T: fmt::Debug + Copy + Num> fmt::Debug for SellMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SellMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  slice height: {}", self.slice_height)?;
        writeln!(f, "  stored: {}", self.stored_len())?;
        write!(f, "}}")
    }
}

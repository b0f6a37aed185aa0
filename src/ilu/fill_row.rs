//! Growable sparse row with fill levels
//!
//! Three parallel arrays (value, fill level, column) in insertion order. The
//! level-p factorization builds each row by merging into a fresh `FillRow`,
//! then swaps it with the working row, so both buffers keep their capacity
//! across rows.

use crate::constants::FILL_ROW_INITIAL_CAPACITY;

/// One sparse row being assembled during ILU(p)
#[derive(Debug, Clone, PartialEq)]
pub struct FillRow<T> {
    values: Vec<T>,
    levels: Vec<usize>,
    cols: Vec<usize>,
}

impl<T: Copy> Default for FillRow<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> FillRow<T> {
    /// Creates an empty row with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(FILL_ROW_INITIAL_CAPACITY)
    }

    /// Creates an empty row able to hold `capacity` entries without growing
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            levels: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    /// Returns true if the row holds no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Appends one entry
    #[inline]
    pub fn push(&mut self, value: T, level: usize, col: usize) {
        self.values.push(value);
        self.levels.push(level);
        self.cols.push(col);
    }

    /// Appends the first `len` entries of another row
    pub fn extend_from(&mut self, other: &FillRow<T>, len: usize) {
        self.values.extend_from_slice(&other.values[..len]);
        self.levels.extend_from_slice(&other.levels[..len]);
        self.cols.extend_from_slice(&other.cols[..len]);
    }

    /// Appends parallel slices of values and columns at one fill level
    pub fn extend_at_level(&mut self, values: &[T], cols: &[usize], level: usize) {
        debug_assert_eq!(values.len(), cols.len());
        self.values.extend_from_slice(values);
        self.cols.extend_from_slice(cols);
        self.levels.extend(std::iter::repeat(level).take(cols.len()));
    }

    /// Keeps only the first `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
        self.levels.truncate(len);
        self.cols.truncate(len);
    }

    /// Removes every entry, keeping the capacity
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Value of entry k
    #[inline]
    pub fn value(&self, k: usize) -> T {
        self.values[k]
    }

    /// Fill level of entry k
    #[inline]
    pub fn level(&self, k: usize) -> usize {
        self.levels[k]
    }

    /// Column of entry k
    #[inline]
    pub fn col(&self, k: usize) -> usize {
        self.cols[k]
    }

    /// Iterates over (value, level, col)
    pub fn iter(&self) -> impl Iterator<Item = (T, usize, usize)> + '_ {
        self.values
            .iter()
            .zip(&self.levels)
            .zip(&self.cols)
            .map(|((&v, &lev), &c)| (v, lev, c))
    }
}

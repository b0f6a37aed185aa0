//! Color-parallel triangular solves
//!
//! After an AMC or ABMC permutation the rows of each color form one
//! contiguous range, split into units (single rows for AMC, aggregated
//! blocks for ABMC). Units of one color never depend on each other, so a
//! color is solved with one rayon parallel iterator over its units while the
//! rows inside a unit run in order. Colors are visited ascending for L and
//! descending for U; the parallel iterator returning is the barrier between
//! colors.
//!
//! Disjointness of the writes is enforced by slice splitting: for the color
//! being solved, `split_at_mut` separates the solved part of the vector from
//! the color's range, and `par_chunks_mut` hands each unit its own rows.
//! The public solves check the factor against the schedule before the
//! first sweep, so a factor ordered for another schedule is an error.

use rayon::prelude::*;

use crate::error::{check_len, Result, SolverError, StructuralError};
use crate::matrix::{BcsrMatrix, CsrMatrix};
use crate::scalar::Scalar;
use crate::trsv::block::{lower_block_row, upper_block_row, validate_block_factor, Solved};

/// Rows scheduled per rayon task at minimum
const MIN_ROWS_PER_TASK: usize = 64;

/// Contiguous color ranges of a permuted matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSchedule {
    /// Start row of every color plus the total row count (size: n_colors + 1)
    boundaries: Vec<usize>,
    /// Rows per independent unit inside a color
    unit: usize,
}

impl ColorSchedule {
    /// Creates a schedule from row boundaries and the unit size
    ///
    /// # Arguments
    ///
    /// * `boundaries` - Non-decreasing start rows of each color, closed by the row count
    /// * `unit` - Rows per independent unit; every boundary must be a multiple of it
    pub fn new(boundaries: Vec<usize>, unit: usize) -> Result<Self> {
        if unit == 0 {
            return Err(SolverError::config("color unit size must be at least 1"));
        }
        if boundaries.first() != Some(&0) {
            return Err(SolverError::config("color boundaries must start at row 0"));
        }
        if boundaries.windows(2).any(|w| w[0] > w[1]) {
            return Err(SolverError::config("color boundaries must be non-decreasing"));
        }
        if let Some(&b) = boundaries.iter().find(|&&b| b % unit != 0) {
            return Err(StructuralError::BlockSizeMismatch { n: b, block: unit }.into());
        }
        Ok(Self { boundaries, unit })
    }

    /// Number of colors
    pub fn n_colors(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Number of rows covered
    pub fn n_rows(&self) -> usize {
        self.boundaries[self.boundaries.len() - 1]
    }

    /// Rows per unit
    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Row range of color c
    #[inline]
    pub fn color_range(&self, c: usize) -> (usize, usize) {
        (self.boundaries[c], self.boundaries[c + 1])
    }

    /// Color boundaries in rows
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    fn color_of_rows(&self) -> Vec<usize> {
        let mut colors = vec![0; self.n_rows()];
        for c in 0..self.n_colors() {
            let (start, end) = self.color_range(c);
            colors[start..end].iter_mut().for_each(|v| *v = c);
        }
        colors
    }

    /// Checks that a unit-lower factor only reads earlier colors or its own unit
    ///
    /// # Returns
    ///
    /// `ColorConflict` naming the first entry that reads another unit of its
    /// own color or a later color
    pub fn validate_lower<T: Scalar>(&self, l: &CsrMatrix<T>) -> Result<()> {
        self.validate(l, |cj, ci| cj < ci)
    }

    /// Checks that an upper factor only reads later colors or its own unit
    pub fn validate_upper<T: Scalar>(&self, u: &CsrMatrix<T>) -> Result<()> {
        self.validate(u, |cj, ci| cj > ci)
    }

    fn validate<T: Scalar>(&self, m: &CsrMatrix<T>, readable: impl Fn(usize, usize) -> bool) -> Result<()> {
        check_len(self.n_rows(), m.n_rows)?;
        check_len(self.n_rows(), m.n_cols)?;
        let colors = self.color_of_rows();

        for i in 0..m.n_rows {
            for (j, _) in m.row_iter(i) {
                if j / self.unit != i / self.unit && !readable(colors[j], colors[i]) {
                    return Err(StructuralError::ColorConflict { row: i, col: j }.into());
                }
            }
        }
        Ok(())
    }

    /// Checks a unit-lower BCSR factor against the schedule
    ///
    /// The unit must equal the block height. Every column of a stored block
    /// is read, zero-filled or not, so the check runs per block column.
    pub fn validate_block_lower<T: Scalar>(&self, l: &BcsrMatrix<T>) -> Result<()> {
        validate_block_factor(l, false)?;
        self.validate_blocks(l, 0, |cj, ci| cj < ci)
    }

    /// Checks an upper BCSR factor against the schedule
    ///
    /// Past the diagonal band, blocks may only touch later colors.
    pub fn validate_block_upper<T: Scalar>(&self, u: &BcsrMatrix<T>) -> Result<()> {
        validate_block_factor(u, true)?;
        self.validate_blocks(u, u.bnl / u.bnw, |cj, ci| cj > ci)
    }

    fn validate_blocks<T: Scalar>(
        &self,
        m: &BcsrMatrix<T>,
        band: usize,
        readable: impl Fn(usize, usize) -> bool,
    ) -> Result<()> {
        check_block_schedule(m, self)?;
        let colors = self.color_of_rows();

        for bi in 0..m.n_block_rows() {
            let row = bi * m.bnl;
            // the band of an upper row was checked to be the unit itself
            for b in m.block_row_ptr[bi] + band..m.block_row_ptr[bi + 1] {
                let first = m.block_col_idx[b] * m.bnw;
                for col in first..first + m.bnw {
                    let own_unit = band == 0 && col / self.unit == bi;
                    if !own_unit && !readable(colors[col], colors[row]) {
                        return Err(StructuralError::ColorConflict { row, col }.into());
                    }
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn min_units_per_task(&self) -> usize {
        (MIN_ROWS_PER_TASK / self.unit).max(1)
    }
}

#[inline]
fn lower_row<T: Scalar>(l: &CsrMatrix<T>, i: usize, solved: &[T], own: &mut [T], own_start: usize) {
    let mut t = own[i - own_start];
    for (j, &v) in l.row_iter(i) {
        let yj = if j >= own_start { own[j - own_start] } else { solved[j] };
        t -= v * yj;
    }
    own[i - own_start] = t;
}

#[inline]
fn upper_row<T: Scalar>(
    u: &CsrMatrix<T>,
    i: usize,
    solved: &[T],
    solved_offset: usize,
    own: &mut [T],
    own_start: usize,
) {
    let range = u.row_range(i);
    let own_end = own_start + own.len();
    let mut t = own[i - own_start];
    for idx in (range.start + 1..range.end).rev() {
        let j = u.col_idx[idx];
        let yj = if j < own_end {
            own[j - own_start]
        } else {
            solved[j - solved_offset]
        };
        t -= u.values[idx] * yj;
    }
    own[i - own_start] = t * u.values[range.start];
}

/// Forward substitution y ← L⁻¹ y, color by color
///
/// `l` is the unit-lower factor of the permuted matrix. It is checked with
/// [`ColorSchedule::validate_lower`] before any row is touched.
pub fn lower_solve_colored<T: Scalar>(
    l: &CsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) -> Result<()> {
    schedule.validate_lower(l)?;
    check_len(l.n_rows, y.len())?;
    lower_sweep_colored(l, schedule, y);
    Ok(())
}

/// Forward substitution on a factor already validated against `schedule`
pub(crate) fn lower_sweep_colored<T: Scalar>(
    l: &CsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) {
    let unit = schedule.unit();

    for c in 0..schedule.n_colors() {
        let (start, end) = schedule.color_range(c);
        let (solved, rest) = y.split_at_mut(start);
        let solved: &[T] = solved;

        rest[..end - start]
            .par_chunks_mut(unit)
            .with_min_len(schedule.min_units_per_task())
            .enumerate()
            .for_each(|(k, own)| {
                let own_start = start + k * unit;
                for i in own_start..own_start + own.len() {
                    lower_row(l, i, solved, own, own_start);
                }
            });
    }
}

/// Backward substitution y ← U⁻¹ y, colors in reverse order
///
/// `u` is the upper factor (inverted diagonal first in each row) of the
/// permuted matrix and is checked with [`ColorSchedule::validate_upper`].
pub fn upper_solve_colored<T: Scalar>(
    u: &CsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) -> Result<()> {
    schedule.validate_upper(u)?;
    check_len(u.n_rows, y.len())?;
    upper_sweep_colored(u, schedule, y);
    Ok(())
}

pub(crate) fn upper_sweep_colored<T: Scalar>(
    u: &CsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) {
    let unit = schedule.unit();

    for c in (0..schedule.n_colors()).rev() {
        let (start, end) = schedule.color_range(c);
        let (_, rest) = y.split_at_mut(start);
        let (current, solved) = rest.split_at_mut(end - start);
        let solved: &[T] = solved;

        current
            .par_chunks_mut(unit)
            .with_min_len(schedule.min_units_per_task())
            .enumerate()
            .for_each(|(k, own)| {
                let own_start = start + k * unit;
                for i in (own_start..own_start + own.len()).rev() {
                    upper_row(u, i, solved, end, own, own_start);
                }
            });
    }
}

fn check_block_schedule<T: Scalar>(m: &BcsrMatrix<T>, schedule: &ColorSchedule) -> Result<()> {
    check_len(schedule.n_rows(), m.n_rows)?;
    if schedule.unit() != m.bnl {
        return Err(SolverError::config(format!(
            "color unit {} must equal the block height {}",
            schedule.unit(),
            m.bnl
        )));
    }
    Ok(())
}

/// Forward substitution on a BCSR factor, one block row per unit
///
/// The schedule's unit must equal the block height, so that every ABMC block
/// is exactly one block row.
pub fn lower_solve_block_colored<T: Scalar>(
    l: &BcsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) -> Result<()> {
    schedule.validate_block_lower(l)?;
    check_len(l.n_rows, y.len())?;
    lower_block_sweep_colored(l, schedule, y);
    Ok(())
}

pub(crate) fn lower_block_sweep_colored<T: Scalar>(
    l: &BcsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) {
    let (bnl, bnw) = (l.bnl, l.bnw);

    for c in 0..schedule.n_colors() {
        let (start, end) = schedule.color_range(c);
        let (solved, rest) = y.split_at_mut(start);
        let solved = Solved { values: &*solved, offset: 0 };

        rest[..end - start]
            .par_chunks_mut(bnl)
            .with_min_len(schedule.min_units_per_task())
            .enumerate()
            .for_each(|(k, own)| {
                lower_block_row(l, start / bnl + k, bnl, bnw, solved, own);
            });
    }
}

/// Backward substitution on a BCSR factor, one block row per unit
pub fn upper_solve_block_colored<T: Scalar>(
    u: &BcsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) -> Result<()> {
    schedule.validate_block_upper(u)?;
    check_len(u.n_rows, y.len())?;
    upper_block_sweep_colored(u, schedule, y);
    Ok(())
}

pub(crate) fn upper_block_sweep_colored<T: Scalar>(
    u: &BcsrMatrix<T>,
    schedule: &ColorSchedule,
    y: &mut [T],
) {
    let (bnl, bnw) = (u.bnl, u.bnw);

    for c in (0..schedule.n_colors()).rev() {
        let (start, end) = schedule.color_range(c);
        let (_, rest) = y.split_at_mut(start);
        let (current, solved) = rest.split_at_mut(end - start);
        let solved = Solved { values: &*solved, offset: end };

        current
            .par_chunks_mut(bnl)
            .with_min_len(schedule.min_units_per_task())
            .enumerate()
            .for_each(|(k, own)| {
                upper_block_row(u, start / bnl + k, bnl, bnw, solved, own);
            });
    }
}

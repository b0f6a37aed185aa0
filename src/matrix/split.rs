//! Splitting a matrix into its triangular parts
//!
//! Every stored entry is classified by its column relative to its row:
//! below the diagonal goes to L, above it to U, on it to D. The
//! [`SplitPolicy`] decides which of these parts share a buffer.

use log::debug;

use crate::config::SplitPolicy;
use crate::error::{Result, SolverError, StructuralError};
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;

/// The buffers produced by one split, tagged by policy
#[derive(Debug, Clone, PartialEq)]
pub enum SplitParts<T: Copy + num_traits::Num> {
    /// `LD-U`: the diagonal closes every row of the lower buffer
    LdU {
        /// Strict lower part plus diagonal
        ld: CsrMatrix<T>,
        /// Strict upper part
        u: CsrMatrix<T>,
    },
    /// `L-DU`: the diagonal opens every row of the upper buffer
    LDu {
        /// Strict lower part
        l: CsrMatrix<T>,
        /// Diagonal plus strict upper part
        du: CsrMatrix<T>,
    },
    /// `L-D-U`: three separate parts
    LDU {
        /// Strict lower part
        l: CsrMatrix<T>,
        /// Diagonal
        d: Vec<T>,
        /// Strict upper part
        u: CsrMatrix<T>,
    },
    /// `LU-D`: both strict triangles share one buffer
    LuD {
        /// Off-diagonal entries in original row order
        lu: CsrMatrix<T>,
        /// Diagonal
        d: Vec<T>,
    },
}

/// Result of [`split`]
#[derive(Debug, Clone, PartialEq)]
pub struct SplitFactors<T: Copy + num_traits::Num> {
    /// The split buffers
    pub parts: SplitParts<T>,
    /// Whether diagonal values are stored as their inverse
    pub diagonal_inverted: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Lower,
    Upper,
    Diagonal,
}

/// Buffer each classified entry is appended to, per policy
fn route(policy: SplitPolicy, part: Target) -> Target {
    match (policy, part) {
        (SplitPolicy::LdU, Target::Diagonal) => Target::Lower,
        (SplitPolicy::LDu, Target::Diagonal) => Target::Upper,
        (SplitPolicy::LuD, Target::Upper) => Target::Lower,
        (_, part) => part,
    }
}

struct CsrBuilder<T> {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Scalar> CsrBuilder<T> {
    fn with_rows(n: usize) -> Self {
        let mut row_ptr = Vec::with_capacity(n + 1);
        row_ptr.push(0);
        Self {
            row_ptr,
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, col: usize, value: T) {
        self.col_idx.push(col);
        self.values.push(value);
    }

    fn end_row(&mut self) {
        self.row_ptr.push(self.col_idx.len());
    }

    fn finish(self, n: usize) -> CsrMatrix<T> {
        CsrMatrix::new(n, n, self.row_ptr, self.col_idx, self.values)
    }
}

/// Splits a square matrix into L, D and U under `policy`
///
/// # Arguments
///
/// * `a` - Factorized (or original) square matrix
/// * `policy` - Which parts share a buffer
/// * `invert_diagonal` - Store every diagonal value as its inverse
///
/// # Returns
///
/// The split buffers. Policies with a separate diagonal require every row to
/// store its diagonal (`MissingDiagonal` otherwise); inverting a zero
/// diagonal is a `ZeroPivot`.
pub fn split<T: Scalar>(
    a: &CsrMatrix<T>,
    policy: SplitPolicy,
    invert_diagonal: bool,
) -> Result<SplitFactors<T>> {
    if !a.is_square() {
        return Err(SolverError::DimensionMismatch {
            expected: a.n_rows,
            got: a.n_cols,
        });
    }
    let n = a.n_rows;
    let separate_diag = matches!(policy, SplitPolicy::LDU | SplitPolicy::LuD);

    let mut lower = CsrBuilder::with_rows(n);
    let mut upper = CsrBuilder::with_rows(n);
    let mut diag = Vec::with_capacity(if separate_diag { n } else { 0 });

    for i in 0..n {
        let mut has_diag = false;
        for (j, &v) in a.row_iter(i) {
            let part = if j < i {
                Target::Lower
            } else if j > i {
                Target::Upper
            } else {
                has_diag = true;
                Target::Diagonal
            };
            let value = if part == Target::Diagonal && invert_diagonal {
                if v == T::zero() {
                    return Err(SolverError::ZeroPivot { row: i });
                }
                v.recip()
            } else {
                v
            };
            match route(policy, part) {
                Target::Lower => lower.push(j, value),
                Target::Upper => upper.push(j, value),
                Target::Diagonal => diag.push(value),
            }
        }
        if separate_diag && !has_diag {
            return Err(StructuralError::MissingDiagonal { row: i }.into());
        }
        lower.end_row();
        upper.end_row();
    }

    let parts = match policy {
        SplitPolicy::LdU => SplitParts::LdU {
            ld: lower.finish(n),
            u: upper.finish(n),
        },
        SplitPolicy::LDu => SplitParts::LDu {
            l: lower.finish(n),
            du: upper.finish(n),
        },
        SplitPolicy::LDU => SplitParts::LDU {
            l: lower.finish(n),
            d: diag,
            u: upper.finish(n),
        },
        SplitPolicy::LuD => SplitParts::LuD {
            lu: lower.finish(n),
            d: diag,
        },
    };

    debug!("split {}: n = {}, nnz = {}", policy, n, a.nnz());

    Ok(SplitFactors {
        parts,
        diagonal_inverted: invert_diagonal,
    })
}

impl<T: Scalar> SplitFactors<T> {
    /// The policy these buffers were produced under
    pub fn policy(&self) -> SplitPolicy {
        match self.parts {
            SplitParts::LdU { .. } => SplitPolicy::LdU,
            SplitParts::LDu { .. } => SplitPolicy::LDu,
            SplitParts::LDU { .. } => SplitPolicy::LDU,
            SplitParts::LuD { .. } => SplitPolicy::LuD,
        }
    }

    /// Takes the unit-lower and upper factors of an `L-DU` split
    ///
    /// This is the layout the triangular solves consume: L without its unit
    /// diagonal, U with its (inverted) diagonal first in every row.
    pub fn into_l_du(self) -> Result<(CsrMatrix<T>, CsrMatrix<T>)> {
        let policy = self.policy();
        match self.parts {
            SplitParts::LDu { l, du } => Ok((l, du)),
            _ => Err(SolverError::config(format!(
                "triangular solves need an L-DU split, got {}",
                policy
            ))),
        }
    }

    /// Converts any split into the unit-lower / inverted-diagonal-upper pair
    ///
    /// An inverted `L-DU` split is taken as is; other policies are summed
    /// back and split again.
    pub fn into_solve_factors(self) -> Result<(CsrMatrix<T>, CsrMatrix<T>)> {
        if self.policy() == SplitPolicy::LDu && self.diagonal_inverted {
            return self.into_l_du();
        }
        split(&self.reconstruct()?, SplitPolicy::LDu, true)?.into_l_du()
    }

    /// Sums the parts back into one matrix, undoing any diagonal inversion
    pub fn reconstruct(&self) -> Result<CsrMatrix<T>> {
        let restore = |v: T| if self.diagonal_inverted { v.recip() } else { v };
        let mut triplets = Vec::new();

        let push_all = |m: &CsrMatrix<T>, triplets: &mut Vec<(usize, usize, T)>| {
            for i in 0..m.n_rows {
                for (j, &v) in m.row_iter(i) {
                    let v = if i == j { restore(v) } else { v };
                    triplets.push((i, j, v));
                }
            }
        };

        let n = match &self.parts {
            SplitParts::LdU { ld, u } => {
                push_all(ld, &mut triplets);
                push_all(u, &mut triplets);
                ld.n_rows
            }
            SplitParts::LDu { l, du } => {
                push_all(l, &mut triplets);
                push_all(du, &mut triplets);
                l.n_rows
            }
            SplitParts::LDU { l, d, u } => {
                push_all(l, &mut triplets);
                push_all(u, &mut triplets);
                triplets.extend(d.iter().enumerate().map(|(i, &v)| (i, i, restore(v))));
                l.n_rows
            }
            SplitParts::LuD { lu, d } => {
                push_all(lu, &mut triplets);
                triplets.extend(d.iter().enumerate().map(|(i, &v)| (i, i, restore(v))));
                lu.n_rows
            }
        };

        Ok(CsrMatrix::from_triplets(n, n, &triplets))
    }
}

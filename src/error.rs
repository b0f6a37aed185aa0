//! Error types shared by the factorization, reordering and solver layers

use thiserror::Error;

/// Result type alias using the crate's [`SolverError`]
pub type Result<T> = std::result::Result<T, SolverError>;

/// Violations of a structural invariant of the input matrix
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// A row has no diagonal entry where a consumer requires one
    #[error("row {row} has no diagonal entry")]
    MissingDiagonal {
        /// The offending row
        row: usize,
    },

    /// The matrix dimension is not a multiple of the requested block size
    #[error("block size {block} does not divide dimension {n}")]
    BlockSizeMismatch {
        /// Matrix dimension
        n: usize,
        /// Requested block size
        block: usize,
    },

    /// Column indices of a row are not strictly ascending
    #[error("column indices of row {row} are not strictly ascending")]
    UnsortedRow {
        /// The offending row
        row: usize,
    },

    /// Inconsistent CSR buffers (lengths, bounds, row pointers)
    #[error("malformed CSR storage: {0}")]
    MalformedCsr(String),

    /// A triangular factor couples two rows that a coloring schedules concurrently
    #[error("rows {row} and {col} share a color unit but are coupled")]
    ColorConflict {
        /// Row being solved
        row: usize,
        /// Column it depends on
        col: usize,
    },
}

/// Errors raised by the solver stack
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Input structure violates an invariant
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Zero pivot met during factorization or diagonal inversion
    #[error("zero pivot at row {row}")]
    ZeroPivot {
        /// Row whose pivot vanished
        row: usize,
    },

    /// Unknown key or unusable parameter at the call boundary
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Vector or matrix dimensions do not match
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },
}

impl SolverError {
    /// Shorthand for [`SolverError::InvalidConfiguration`]
    pub fn config(msg: impl Into<String>) -> Self {
        SolverError::InvalidConfiguration(msg.into())
    }
}

/// Checks that a vector has the expected length
pub(crate) fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(SolverError::DimensionMismatch { expected, got });
    }
    Ok(())
}

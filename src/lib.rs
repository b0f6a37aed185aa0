//! # sparse-krylov: preconditioned Krylov solvers for sparse linear systems
//!
//! This library solves large sparse systems A x = b with restarted GMRES,
//! BiCGStab and restarted GCR, preconditioned by incomplete LU
//! factorizations whose triangular solves can run in parallel after a
//! multi-color reordering.
//!
//! ## Components
//!
//! 1. **Matrix formats**: CSR, CSC, block CSR (BCSR) and sliced ELLPACK,
//!    with conversions, triangular splits, padding and symmetric expansion.
//!
//! 2. **Incomplete factorizations**:
//!    - **ILU(0)**: in place, on the pattern of the input
//!    - **ILU(p)**: level-of-fill factorization keeping fill up to level p
//!
//! 3. **Reordering**:
//!    - **AMC**: rows colored so that no two coupled rows share a color
//!    - **ABMC**: rows aggregated into blocks, then blocks colored
//!
//! 4. **Triangular solves**: sequential or color by color, on CSR or BCSR
//!    factors.
//!
//! 5. **Krylov drivers**: GMRES(m), BiCGStab and GCR(m), each accepting any
//!    [`Preconditioner`].
//!
//! ## Usage
//!
//! ```
//! use sparse_krylov::{
//!     build_preconditioner, prepare_system, solve, CsrMatrix, Method,
//!     PreconditionerConfig, Shape, SolverConfig,
//! };
//!
//! // lower half of the symmetric matrix [4 -1; -1 4]
//! let half = CsrMatrix::new(2, 2, vec![0, 1, 3], vec![0, 0, 1], vec![4.0_f64, -1.0, 4.0]);
//! let a = prepare_system(half, Shape::Symmetric, true).unwrap();
//!
//! let m = build_preconditioner(&a, &PreconditionerConfig::default(), Shape::Symmetric).unwrap();
//! let b = vec![3.0, 3.0];
//! let mut x = vec![0.0; 2];
//! let result = solve(Method::Gmres, &a, &b, &mut x, m.as_ref(), &SolverConfig::default()).unwrap();
//!
//! assert!(result.converged);
//! assert!((x[0] - 1.0).abs() < 1e-8);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod ilu;
pub mod kernels;
pub mod matrix;
pub mod reordering;
pub mod scalar;
pub mod solver;
pub mod trsv;
pub mod utils;

// Re-export primary components
pub use config::{
    BlockingMethod, Method, OrderingConfig, PreconditionerConfig, PreconditionerKind, Shape,
    SolverConfig, SplitPolicy, SystemParameters, Verbosity,
};
pub use error::{Result, SolverError, StructuralError};
pub use ilu::{ilu0, ilup};
pub use matrix::{split, BcsrMatrix, CscMatrix, CsrMatrix, SellMatrix, SplitFactors, SplitParts};
pub use reordering::{reorder, Permutation};
pub use scalar::Scalar;
pub use solver::{
    bicgstab, build_preconditioner, gcr, gmres, prepare_system, relative_residual, solve,
    Identity, Preconditioner, SolveResult,
};
pub use trsv::ColorSchedule;
pub use utils::{from_sprs_csr, to_sprs_csc, to_sprs_csr};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

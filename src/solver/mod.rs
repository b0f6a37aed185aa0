//! Preconditioned Krylov drivers
//!
//! GMRES(m), BiCGStab and GCR(m) share one calling convention: the system
//! matrix, right-hand side, initial guess (overwritten by the solution), a
//! [`Preconditioner`] and a [`SolverConfig`]. Preconditioning is applied on
//! the right, so the residual every driver tracks is the residual of the
//! original system and the tolerance means ||b - Ax|| < epsilon * ||b||.

pub mod bicgstab;
pub mod gcr;
pub mod gmres;
pub mod preconditioner;

use std::fmt;

use log::{debug, info};

use crate::config::{Method, Shape, SolverConfig, Verbosity};
use crate::error::{check_len, Result, SolverError};
use crate::kernels::nrm2;
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;

pub use bicgstab::bicgstab;
pub use gcr::gcr;
pub use gmres::gmres;
pub use preconditioner::{
    build_preconditioner, BlockIluPreconditioner, ColoredBlockIluPreconditioner,
    ColoredIluPreconditioner, Identity, IluPreconditioner, Preconditioner,
};

/// Outcome of one solve
///
/// Running out of iterations is reported here with `converged == false`,
/// not as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Whether the tracked residual met the tolerance
    pub converged: bool,
    /// Krylov iterations performed
    pub iterations: usize,
    /// Last tracked relative residual
    pub relative_residual: f64,
    /// Tracked relative residual after every iteration
    pub history: Vec<f64>,
    /// ||b - Ax|| / ||b|| recomputed from the returned x
    pub true_residual: f64,
}

impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} iterations, relative residual = {:.3e} (true {:.3e})",
            if self.converged {
                "converged"
            } else {
                "did not converge"
            },
            self.iterations,
            self.relative_residual,
            self.true_residual
        )
    }
}

/// Computes ||b - Ax|| / ||b||
///
/// Returns the absolute residual norm when b is zero.
pub fn relative_residual<T: Scalar>(a: &CsrMatrix<T>, b: &[T], x: &[T]) -> Result<f64> {
    let mut r = vec![T::zero(); b.len()];
    a.residual(b, x, &mut r)?;
    let bnorm = nrm2(b).as_f64();
    let rnorm = nrm2(&r).as_f64();
    Ok(if bnorm == 0.0 { rnorm } else { rnorm / bnorm })
}

/// Residual bookkeeping shared by the drivers
pub(crate) struct Monitor {
    method: Method,
    preconditioner: &'static str,
    verbosity: Verbosity,
    epsilon: f64,
    bnorm: f64,
    history: Vec<f64>,
    last: f64,
}

impl Monitor {
    pub(crate) fn new<T: Scalar>(
        method: Method,
        preconditioner: &'static str,
        config: &SolverConfig,
        b: &[T],
    ) -> Self {
        Self {
            method,
            preconditioner,
            verbosity: config.verbosity,
            epsilon: config.epsilon,
            bnorm: nrm2(b).as_f64(),
            history: Vec::new(),
            last: 1.0,
        }
    }

    /// ||b||, or 1 for a zero right-hand side so that norms stay absolute
    pub(crate) fn scale(&self) -> f64 {
        if self.bnorm == 0.0 {
            1.0
        } else {
            self.bnorm
        }
    }

    /// Relative size of a residual norm, without recording it
    pub(crate) fn relative<T: Scalar>(&self, rnorm: T) -> f64 {
        rnorm.as_f64() / self.scale()
    }

    /// Whether a residual norm meets the tolerance, without recording it
    pub(crate) fn check<T: Scalar>(&mut self, rnorm: T) -> bool {
        self.last = self.relative(rnorm);
        self.last < self.epsilon
    }

    /// Records the residual norm of one iteration; true once converged
    pub(crate) fn record<T: Scalar>(&mut self, rnorm: T) -> bool {
        let converged = self.check(rnorm);
        self.history.push(self.last);
        if self.verbosity >= Verbosity::Iterations {
            debug!(
                "{} iteration {}: relative residual {:.6e}",
                self.method,
                self.history.len(),
                self.last
            );
        }
        converged
    }

    /// Builds the result and emits the summary line
    pub(crate) fn finish<T: Scalar>(
        self,
        a: &CsrMatrix<T>,
        b: &[T],
        x: &[T],
        converged: bool,
    ) -> Result<SolveResult> {
        let result = SolveResult {
            converged,
            iterations: self.history.len(),
            relative_residual: self.last,
            true_residual: relative_residual(a, b, x)?,
            history: self.history,
        };
        if self.verbosity >= Verbosity::Summary {
            info!(
                "{} ({}): {}",
                self.method, self.preconditioner, result
            );
        }
        Ok(result)
    }
}

/// Checks the shapes of a system before a driver touches it
pub(crate) fn check_system<T: Scalar>(
    a: &CsrMatrix<T>,
    b: &[T],
    x: &[T],
    config: &SolverConfig,
) -> Result<()> {
    config.validate()?;
    if !a.is_square() {
        return Err(SolverError::DimensionMismatch {
            expected: a.n_rows,
            got: a.n_cols,
        });
    }
    check_len(a.n_rows, b.len())?;
    check_len(a.n_rows, x.len())
}

/// Turns an input matrix into the form the solvers expect
///
/// # Arguments
///
/// * `a` - Matrix as ingested; for `Shape::Symmetric` only its lower triangle is stored
/// * `shape` - Declared shape
/// * `remove_zeros` - Drop explicitly stored zeros first
///
/// # Returns
///
/// The full matrix, after checking that every diagonal entry is present
pub fn prepare_system<T: Scalar>(
    mut a: CsrMatrix<T>,
    shape: Shape,
    remove_zeros: bool,
) -> Result<CsrMatrix<T>> {
    if remove_zeros {
        let removed = a.remove_zeros();
        debug!("prepare_system: removed {} explicit zeros", removed);
    }
    let a = match shape {
        Shape::Symmetric => a.expand()?,
        Shape::General => a,
    };
    a.check_structure()?;
    Ok(a)
}

/// Runs the selected Krylov method on a thread pool of the configured size
///
/// # Arguments
///
/// * `method` - GMRES(m), BiCGStab or GCR(m)
/// * `a` - Square system matrix
/// * `b` - Right-hand side
/// * `x` - Initial guess on entry, approximate solution on return
/// * `preconditioner` - Any preconditioner; [`Identity`] for none
/// * `config` - Iteration limits, tolerance, verbosity and thread count
pub fn solve<T: Scalar>(
    method: Method,
    a: &CsrMatrix<T>,
    b: &[T],
    x: &mut [T],
    preconditioner: &dyn Preconditioner<T>,
    config: &SolverConfig,
) -> Result<SolveResult> {
    config.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.system_params.n_threads)
        .build()
        .map_err(|e| SolverError::config(format!("thread pool: {}", e)))?;

    pool.install(|| match method {
        Method::Gmres => gmres(a, b, x, preconditioner, config),
        Method::BiCgStab => bicgstab(a, b, x, preconditioner, config),
        Method::Gcr => gcr(a, b, x, preconditioner, config),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_residual() {
        let a = CsrMatrix::from_diagonal(&[2.0, 2.0]);
        let b = [2.0, 0.0];
        assert_eq!(relative_residual(&a, &b, &[1.0, 0.0]).unwrap(), 0.0);
        assert_eq!(relative_residual(&a, &b, &[0.0, 0.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_prepare_symmetric_half() {
        // lower half of [4 1; 1 4]
        let half = CsrMatrix::new(2, 2, vec![0, 1, 3], vec![0, 0, 1], vec![4.0, 1.0, 4.0]);
        let full = prepare_system(half, Shape::Symmetric, false).unwrap();
        assert_eq!(full.to_dense(), vec![vec![4.0, 1.0], vec![1.0, 4.0]]);
    }

    #[test]
    fn test_prepare_removes_zeros_then_checks_diagonal() {
        let a = CsrMatrix::new(2, 2, vec![0, 2, 4], vec![0, 1, 0, 1], vec![1.0, 0.0, 2.0, 0.0]);
        let err = prepare_system(a, Shape::General, true).unwrap_err();
        assert_eq!(
            err,
            SolverError::Structural(crate::error::StructuralError::MissingDiagonal { row: 1 })
        );
    }

    #[test]
    fn test_solve_rejects_bad_config() {
        let a = CsrMatrix::<f64>::identity(2);
        let mut x = vec![0.0; 2];
        let config = SolverConfig::default().with_threads(0);
        assert!(matches!(
            solve(Method::Gmres, &a, &[1.0, 1.0], &mut x, &Identity, &config),
            Err(SolverError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_display() {
        let result = SolveResult {
            converged: true,
            iterations: 3,
            relative_residual: 1e-9,
            history: vec![0.1, 1e-4, 1e-9],
            true_residual: 1e-9,
        };
        assert!(result.to_string().starts_with("converged in 3 iterations"));
    }
}

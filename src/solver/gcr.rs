//! Restarted GCR(m) with right preconditioning

use log::debug;

use crate::config::{Method, SolverConfig};
use crate::error::Result;
use crate::kernels::{axpy, dot, nrm2};
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;
use crate::solver::{check_system, Monitor, Preconditioner, SolveResult};

/// Search directions of one cycle and their images under A
struct Directions<T> {
    p: Vec<Vec<T>>,
    ap: Vec<Vec<T>>,
    /// (A p_i, A p_i)
    ap_norms: Vec<T>,
}

impl<T: Scalar> Directions<T> {
    fn with_capacity(m: usize) -> Self {
        Self {
            p: Vec::with_capacity(m),
            ap: Vec::with_capacity(m),
            ap_norms: Vec::with_capacity(m),
        }
    }

    fn clear(&mut self) {
        self.p.clear();
        self.ap.clear();
        self.ap_norms.clear();
    }

    /// Orthogonalizes q = A z against every stored image, applying the same
    /// combination to z
    fn orthogonalize(&self, z: &mut [T], q: &mut [T]) {
        for i in 0..self.p.len() {
            let beta = dot(q, &self.ap[i]) / self.ap_norms[i];
            axpy(-beta, &self.ap[i], q);
            axpy(-beta, &self.p[i], z);
        }
    }

    fn push(&mut self, z: Vec<T>, q: Vec<T>, qq: T) {
        self.p.push(z);
        self.ap.push(q);
        self.ap_norms.push(qq);
    }
}

/// Solves A x = b with restarted GCR(m)
///
/// Each inner step preconditions the current residual, orthogonalizes its
/// image under A against the images of all previous directions of the
/// cycle, and moves x along the new direction by the step that minimizes
/// the residual norm. Since the images are mutually orthogonal the residual
/// norm decreases monotonically within a cycle. After `config.restart`
/// steps the directions are discarded and the true residual is recomputed.
///
/// # Returns
///
/// The solve summary; a direction whose image vanishes ends the solve
/// without convergence
pub fn gcr<T: Scalar>(
    a: &CsrMatrix<T>,
    b: &[T],
    x: &mut [T],
    preconditioner: &dyn Preconditioner<T>,
    config: &SolverConfig,
) -> Result<SolveResult> {
    check_system(a, b, x, config)?;
    let n = b.len();
    let m = config.restart;
    let mut monitor = Monitor::new(Method::Gcr, preconditioner.name(), config, b);

    let mut r = vec![T::zero(); n];
    let mut dirs = Directions::with_capacity(m);
    let mut converged = false;
    let mut stalled = false;

    'cycles: for _cycle in 0..config.max_outer_iterations {
        a.residual(b, x, &mut r)?;
        if monitor.check(nrm2(&r)) {
            converged = true;
            break;
        }
        dirs.clear();

        for _ in 0..m {
            let mut z = vec![T::zero(); n];
            let mut q = vec![T::zero(); n];
            preconditioner.apply(&r, &mut z)?;
            a.spmv(&z, &mut q)?;
            dirs.orthogonalize(&mut z, &mut q);

            let qq = dot(&q, &q);
            if qq == T::zero() {
                stalled = true;
                break 'cycles;
            }
            let alpha = dot(&r, &q) / qq;
            axpy(alpha, &z, x);
            axpy(-alpha, &q, &mut r);

            if monitor.record(nrm2(&r)) {
                converged = true;
                break 'cycles;
            }
            dirs.push(z, q, qq);
        }
    }

    if stalled {
        debug!("gcr: direction image vanished, stopping");
    }
    monitor.finish(a, b, x, converged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PreconditionerConfig, Shape};
    use crate::solver::{build_preconditioner, Identity};

    fn convection(n: usize) -> CsrMatrix<f64> {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.5));
            if i > 0 {
                triplets.push((i, i - 1, -1.4));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -0.6));
            }
        }
        CsrMatrix::from_triplets(n, n, &triplets)
    }

    #[test]
    fn test_gcr_converges() {
        let n = 60;
        let a = convection(n);
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let config = SolverConfig::default().with_restart(10).with_epsilon(1e-10);

        let result = gcr(&a, &b, &mut x, &Identity, &config).unwrap();
        assert!(result.converged);
        assert!(result.true_residual < 1e-8);
    }

    #[test]
    fn test_gcr_residual_monotone_within_cycle() {
        let n = 30;
        let a = convection(n);
        let b: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).cos()).collect();
        let mut x = vec![0.0; n];
        let config = SolverConfig::default()
            .with_restart(n)
            .with_max_outer_iterations(1)
            .with_epsilon(1e-12);

        let result = gcr(&a, &b, &mut x, &Identity, &config).unwrap();
        for pair in result.history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-14);
        }
    }

    #[test]
    fn test_gcr_preconditioned_needs_fewer_iterations() {
        let n = 80;
        let a = convection(n);
        let b = vec![1.0; n];
        let config = SolverConfig::default().with_restart(20).with_epsilon(1e-10);

        let mut x = vec![0.0; n];
        let plain = gcr(&a, &b, &mut x, &Identity, &config).unwrap();

        // tridiagonal: ILU(0) is the exact LU
        let ilu = build_preconditioner(&a, &PreconditionerConfig::default(), Shape::General).unwrap();
        let mut x = vec![0.0; n];
        let preconditioned = gcr(&a, &b, &mut x, ilu.as_ref(), &config).unwrap();

        assert!(preconditioned.converged);
        assert!(preconditioned.iterations < plain.iterations);
        assert!(preconditioned.iterations <= 2);
    }
}

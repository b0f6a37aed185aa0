//! BiCGStab with right preconditioning

use crate::config::{Method, SolverConfig};
use crate::error::Result;
use crate::kernels::{axpby, axpy, axpyz, dot, nrm2};
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;
use crate::solver::{check_system, Monitor, Preconditioner, SolveResult};

/// Solves A x = b with BiCGStab
///
/// The shadow residual is the initial residual. Every iteration performs two
/// products with A K, where K is the preconditioner: one along the search
/// direction p, giving α, and one along the intermediate residual s, giving
/// the stabilization weight ω that minimizes ||s - ω A K s||.
///
/// If s already meets the tolerance, x is advanced by α K p only and the
/// solve ends; the stabilization step would divide zero by zero.
///
/// The solve also stops, without converging, when ρ = (r̂, r) or
/// (r̂, A K p) vanishes, or when ω becomes zero.
pub fn bicgstab<T: Scalar>(
    a: &CsrMatrix<T>,
    b: &[T],
    x: &mut [T],
    preconditioner: &dyn Preconditioner<T>,
    config: &SolverConfig,
) -> Result<SolveResult> {
    check_system(a, b, x, config)?;
    let n = b.len();
    let mut monitor = Monitor::new(Method::BiCgStab, preconditioner.name(), config, b);

    let mut r = vec![T::zero(); n];
    a.residual(b, x, &mut r)?;
    if monitor.check(nrm2(&r)) {
        return monitor.finish(a, b, x, true);
    }

    let shadow = r.clone();
    let mut p = vec![T::zero(); n];
    let mut v = vec![T::zero(); n];
    let mut s = vec![T::zero(); n];
    let mut t = vec![T::zero(); n];
    let mut p_hat = vec![T::zero(); n];
    let mut s_hat = vec![T::zero(); n];

    let mut rho_prev = T::one();
    let mut alpha = T::one();
    let mut omega = T::one();
    let mut converged = false;

    for iteration in 0..config.max_iterations {
        let rho = dot(&shadow, &r);
        if rho == T::zero() {
            break;
        }

        if iteration == 0 {
            p.copy_from_slice(&r);
        } else {
            // p = r + β (p - ω v)
            let beta = (rho / rho_prev) * (alpha / omega);
            axpy(-omega, &v, &mut p);
            axpby(T::one(), &r, beta, &mut p);
        }

        preconditioner.apply(&p, &mut p_hat)?;
        a.spmv(&p_hat, &mut v)?;
        let sigma = dot(&shadow, &v);
        if sigma == T::zero() {
            break;
        }
        alpha = rho / sigma;

        axpyz(-alpha, &v, &r, &mut s);
        let s_norm = nrm2(&s);
        if monitor.check(s_norm) {
            axpy(alpha, &p_hat, x);
            monitor.record(s_norm);
            converged = true;
            break;
        }

        preconditioner.apply(&s, &mut s_hat)?;
        a.spmv(&s_hat, &mut t)?;
        let tt = dot(&t, &t);
        omega = if tt == T::zero() { T::zero() } else { dot(&t, &s) / tt };

        axpy(alpha, &p_hat, x);
        axpy(omega, &s_hat, x);
        axpyz(-omega, &t, &s, &mut r);

        if monitor.record(nrm2(&r)) {
            converged = true;
            break;
        }
        if omega == T::zero() {
            break;
        }
        rho_prev = rho;
    }

    monitor.finish(a, b, x, converged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PreconditionerConfig, Shape};
    use crate::solver::{build_preconditioner, Identity};

    #[test]
    fn test_diagonal_system_one_iteration() {
        let a = CsrMatrix::from_diagonal(&[4.0_f64, 9.0, 16.0]);
        let b = vec![4.0, 9.0, 16.0];
        let mut x = vec![0.0; 3];
        let ilu = build_preconditioner(&a, &PreconditionerConfig::default(), Shape::General).unwrap();
        let config = SolverConfig::default().with_epsilon(1e-10);

        let result = bicgstab(&a, &b, &mut x, ilu.as_ref(), &config).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        for xi in &x {
            assert!((xi - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_nonsymmetric_convergence() {
        let n = 50;
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 4.0));
            if i > 0 {
                triplets.push((i, i - 1, -2.0));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
            }
        }
        let a = CsrMatrix::from_triplets(n, n, &triplets);
        let b: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let mut x = vec![0.0; n];
        let config = SolverConfig::default().with_epsilon(1e-10);

        let result = bicgstab(&a, &b, &mut x, &Identity, &config).unwrap();
        assert!(result.converged);
        assert!(result.true_residual < 1e-8);
        assert_eq!(result.history.len(), result.iterations);
    }

    #[test]
    fn test_initial_guess_already_solves() {
        let a = CsrMatrix::from_diagonal(&[2.0, 4.0]);
        let mut x = vec![1.0, 1.0];
        let result = bicgstab(&a, &[2.0, 4.0], &mut x, &Identity, &SolverConfig::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_iteration_budget() {
        let n = 30;
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
                triplets.push((i + 1, i, -1.0));
            }
        }
        let a = CsrMatrix::from_triplets(n, n, &triplets);
        let mut x = vec![0.0; n];
        let config = SolverConfig::default().with_max_iterations(3).with_epsilon(1e-14);

        let result = bicgstab(&a, &vec![1.0; n], &mut x, &Identity, &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }
}

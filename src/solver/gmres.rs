//! Restarted GMRES(m) with right preconditioning

use ndarray::Array2;

use crate::config::{Method, SolverConfig};
use crate::error::Result;
use crate::kernels::{axpy, dot, nrm2, scal, upper_trsv, Givens};
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;
use crate::solver::{check_system, Monitor, Preconditioner, SolveResult};

/// Arnoldi basis, Hessenberg matrix and rotations of one restart cycle
struct Workspace<T> {
    /// m + 1 basis vectors
    basis: Vec<Vec<T>>,
    /// (m + 1) x m Hessenberg matrix, reduced to upper triangular in place
    h: Array2<T>,
    rotations: Vec<Givens<T>>,
    /// Rotated residual projection ||r0|| e1
    g: Vec<T>,
    y: Vec<T>,
}

impl<T: Scalar> Workspace<T> {
    fn new(n: usize, m: usize) -> Self {
        Self {
            basis: vec![vec![T::zero(); n]; m + 1],
            h: Array2::zeros((m + 1, m)),
            rotations: Vec::with_capacity(m),
            g: vec![T::zero(); m + 1],
            y: vec![T::zero(); m],
        }
    }

    fn reset(&mut self, beta: T) {
        self.h.fill(T::zero());
        self.rotations.clear();
        self.g.iter_mut().for_each(|v| *v = T::zero());
        self.g[0] = beta;
    }

    /// Modified Gram-Schmidt of `w` against basis vectors 0..=j
    ///
    /// Fills column j of the Hessenberg matrix and stores the normalized
    /// remainder as basis vector j + 1, unless it vanished.
    fn orthogonalize(&mut self, j: usize, w: &mut [T]) {
        for i in 0..=j {
            let hij = dot(w, &self.basis[i]);
            self.h[[i, j]] = hij;
            axpy(-hij, &self.basis[i], w);
        }
        let norm = nrm2(w);
        self.h[[j + 1, j]] = norm;

        // a vanishing norm means the Krylov space is invariant; the next
        // basis vector is never read because the cycle ends here
        if norm != T::zero() {
            let next = &mut self.basis[j + 1];
            next.copy_from_slice(w);
            scal(norm.recip(), next);
        }
    }

    /// Rotates column j into upper triangular form and updates g
    ///
    /// Returns |g[j + 1]|, the residual norm of the current iterate.
    fn rotate(&mut self, j: usize) -> T {
        for (i, rot) in self.rotations.iter().enumerate() {
            let (mut a, mut b) = (self.h[[i, j]], self.h[[i + 1, j]]);
            rot.apply(&mut a, &mut b);
            self.h[[i, j]] = a;
            self.h[[i + 1, j]] = b;
        }

        let (rot, r) = Givens::generate(self.h[[j, j]], self.h[[j + 1, j]]);
        self.h[[j, j]] = r;
        self.h[[j + 1, j]] = T::zero();

        let (mut a, mut b) = (self.g[j], self.g[j + 1]);
        rot.apply(&mut a, &mut b);
        self.g[j] = a;
        self.g[j + 1] = b;
        self.rotations.push(rot);

        b.abs()
    }

    /// Combination of the first k basis vectors with the least squares
    /// coefficients
    fn combination(&mut self, k: usize, out: &mut [T]) -> Result<()> {
        upper_trsv(&self.h, &self.g, &mut self.y, k)?;
        out.iter_mut().for_each(|v| *v = T::zero());
        for i in 0..k {
            axpy(self.y[i], &self.basis[i], out);
        }
        Ok(())
    }
}

/// Solves A x = b with restarted GMRES(m)
///
/// Each cycle builds up to `config.restart` Arnoldi vectors of A K, where K
/// is the preconditioner, and reduces the Hessenberg matrix with Givens
/// rotations as it grows, so the residual norm is known after every step
/// without an extra product. At the end of a cycle the triangular system is
/// back-solved and x ← x + K (V y). The true residual is recomputed at the
/// start of each cycle.
///
/// # Arguments
///
/// * `a` - Square system matrix
/// * `b` - Right-hand side
/// * `x` - Initial guess, overwritten by the approximate solution
/// * `preconditioner` - Right preconditioner
/// * `config` - `restart` and `max_outer_iterations` bound the work
///
/// # Returns
///
/// The solve summary; `converged` is false if the cycles ran out
pub fn gmres<T: Scalar>(
    a: &CsrMatrix<T>,
    b: &[T],
    x: &mut [T],
    preconditioner: &dyn Preconditioner<T>,
    config: &SolverConfig,
) -> Result<SolveResult> {
    check_system(a, b, x, config)?;
    let n = b.len();
    let m = config.restart;
    let mut monitor = Monitor::new(Method::Gmres, preconditioner.name(), config, b);

    let mut ws = Workspace::new(n, m);
    let mut r = vec![T::zero(); n];
    let mut w = vec![T::zero(); n];
    let mut z = vec![T::zero(); n];
    let mut converged = false;

    for _cycle in 0..config.max_outer_iterations {
        a.residual(b, x, &mut r)?;
        let beta = nrm2(&r);
        if monitor.check(beta) {
            converged = true;
            break;
        }

        ws.reset(beta);
        ws.basis[0].copy_from_slice(&r);
        scal(beta.recip(), &mut ws.basis[0]);

        let mut k = 0;
        for j in 0..m {
            preconditioner.apply(&ws.basis[j], &mut z)?;
            a.spmv(&z, &mut w)?;
            ws.orthogonalize(j, &mut w);
            let residual = ws.rotate(j);
            k = j + 1;
            if monitor.record(residual) {
                converged = true;
                break;
            }
        }

        ws.combination(k, &mut w)?;
        preconditioner.apply(&w, &mut z)?;
        axpy(T::one(), &z, x);

        if converged {
            break;
        }
    }

    monitor.finish(a, b, x, converged)
}

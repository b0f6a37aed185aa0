//! Dense vector kernels
//!
//! Every kernel switches to a rayon parallel iterator once the vector length
//! reaches [`PARALLEL_VECTOR_THRESHOLD`]; shorter vectors stay sequential.
//! Length mismatches are caller bugs and trip debug assertions only.

use rayon::prelude::*;

use crate::constants::PARALLEL_VECTOR_THRESHOLD;
use crate::scalar::Scalar;

#[inline]
fn parallel(n: usize) -> bool {
    n >= PARALLEL_VECTOR_THRESHOLD
}

/// y = x
pub fn copy<T: Scalar>(x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    if parallel(x.len()) {
        y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, &xi)| *yi = xi);
    } else {
        y.copy_from_slice(x);
    }
}

/// x = a x
pub fn scal<T: Scalar>(a: T, x: &mut [T]) {
    if parallel(x.len()) {
        x.par_iter_mut().for_each(|xi| *xi *= a);
    } else {
        x.iter_mut().for_each(|xi| *xi *= a);
    }
}

/// y = a x + y
pub fn axpy<T: Scalar>(a: T, x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    if parallel(x.len()) {
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, &xi)| *yi += a * xi);
    } else {
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi += a * xi;
        }
    }
}

/// y = a x + b y
pub fn axpby<T: Scalar>(a: T, x: &[T], b: T, y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    if parallel(x.len()) {
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, &xi)| *yi = a * xi + b * *yi);
    } else {
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi = a * xi + b * *yi;
        }
    }
}

/// z = a x + y
pub fn axpyz<T: Scalar>(a: T, x: &[T], y: &[T], z: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), z.len());
    if parallel(x.len()) {
        z.par_iter_mut()
            .zip(x.par_iter().zip(y.par_iter()))
            .for_each(|(zi, (&xi, &yi))| *zi = a * xi + yi);
    } else {
        for ((zi, &xi), &yi) in z.iter_mut().zip(x).zip(y) {
            *zi = a * xi + yi;
        }
    }
}

/// Returns xᵀ y
pub fn dot<T: Scalar>(x: &[T], y: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len());
    if parallel(x.len()) {
        x.par_iter().zip(y.par_iter()).map(|(&a, &b)| a * b).sum()
    } else {
        x.iter().zip(y).map(|(&a, &b)| a * b).sum()
    }
}

/// Returns the Euclidean norm of x
pub fn nrm2<T: Scalar>(x: &[T]) -> T {
    dot(x, x).sqrt()
}

/// y = x ∘ y (elementwise product)
pub fn hadamard_product<T: Scalar>(x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    if parallel(x.len()) {
        y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, &xi)| *yi *= xi);
    } else {
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi *= xi;
        }
    }
}

/// y = y ∘ x⁻¹ (elementwise division)
pub fn hadamard_division<T: Scalar>(x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    if parallel(x.len()) {
        y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, &xi)| *yi /= xi);
    } else {
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi /= xi;
        }
    }
}

/// A plane rotation `[c -s; s c]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Givens<T> {
    /// Cosine
    pub c: T,
    /// Sine
    pub s: T,
}

impl<T: Scalar> Givens<T> {
    /// Builds the rotation that maps (a, b) to (r, 0)
    ///
    /// # Returns
    ///
    /// The rotation and r = sqrt(a² + b²). For a = b = 0 the identity
    /// rotation is returned with r = 0.
    pub fn generate(a: T, b: T) -> (Self, T) {
        let r = a.hypot(b);
        if r == T::zero() {
            return (
                Self {
                    c: T::one(),
                    s: T::zero(),
                },
                r,
            );
        }
        (Self { c: a / r, s: -b / r }, r)
    }

    /// Applies the rotation to the pair (a, b)
    #[inline]
    pub fn apply(&self, a: &mut T, b: &mut T) {
        let t = *a;
        *a = self.c * t - self.s * *b;
        *b = self.s * t + self.c * *b;
    }
}

//! Numeric kernels: dense vector operations, the small dense triangular
//! solve used by GMRES, and sparse matrix-vector products

pub mod blas1;
pub mod dense;
pub mod spmv;

pub use blas1::{
    axpby, axpy, axpyz, copy, dot, hadamard_division, hadamard_product, nrm2, scal, Givens,
};
pub use dense::upper_trsv;

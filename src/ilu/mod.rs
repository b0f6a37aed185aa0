//! Incomplete LU factorizations used as preconditioners
//!
//! Both variants overwrite their input with the combined L\U factor:
//! strictly lower entries hold the multipliers of the unit-lower L, the rest
//! hold U. Callers that still need the original matrix factorize a
//! [`CsrMatrix::duplicate`](crate::matrix::CsrMatrix::duplicate).

pub mod fill_row;
pub mod ilu0;
pub mod ilup;

pub use fill_row::FillRow;
pub use ilu0::ilu0;
pub use ilup::ilup;

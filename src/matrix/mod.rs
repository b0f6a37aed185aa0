// Matrix data structures and format conversions

pub mod bcsr;
pub mod conversion;
pub mod csc;
pub mod csr;
pub mod sell;
pub mod split;
pub mod structure;

pub use bcsr::BcsrMatrix;
pub use csc::CscMatrix;
pub use csr::CsrMatrix;
pub use sell::SellMatrix;
pub use split::{split, SplitFactors, SplitParts};
pub use structure::pad_vector;

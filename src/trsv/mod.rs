//! Sparse triangular solves: sequential and color-parallel, CSR and BCSR

pub mod block;
pub mod colored;
pub mod sequential;

pub use colored::{
    lower_solve_block_colored, lower_solve_colored, upper_solve_block_colored,
    upper_solve_colored, ColorSchedule,
};
pub use sequential::{lower_solve, lower_solve_in_place, upper_solve, upper_solve_in_place};

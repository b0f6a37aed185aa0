//! Multi-color reorderings for parallel triangular solves
//!
//! This module implements the two orderings used by the colored ILU
//! preconditioners:
//! - Algebraic multi-coloring (AMC): rows are colored so that no two rows of
//!   one color are coupled, then grouped by color
//! - Algebraic block multi-coloring (ABMC): rows are first aggregated into
//!   fixed-size blocks, the block graph is colored, and blocks are grouped by
//!   color with their rows kept together
//!
//! After either permutation the lower and upper factors of the reordered
//! matrix can be solved one color at a time with every unit of a color in
//! parallel.

pub mod adjacency;
pub mod blocking;
pub mod coloring;
pub mod permutation;

use log::debug;

use crate::config::{BlockingMethod, OrderingConfig, Shape};
use crate::error::Result;
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;

pub use adjacency::Graph;
pub use blocking::Blocking;
pub use coloring::{greedy_coloring, Coloring};
pub use permutation::Permutation;

/// Generic trait for color orderings
///
/// Implementations turn the adjacency graph of a square matrix into a
/// symmetric permutation whose colors form contiguous row ranges.
pub trait ColorOrdering {
    /// Computes the permutation for a graph
    ///
    /// # Arguments
    ///
    /// * `graph` - Symmetric adjacency graph of the matrix
    ///
    /// # Returns
    ///
    /// The permutation, or `BlockSizeMismatch` if the ordering cannot
    /// partition the vertices evenly
    fn permutation(&self, graph: &Graph) -> Result<Permutation>;
}

/// Row-wise algebraic multi-coloring
#[derive(Debug, Clone, Copy, Default)]
pub struct Amc;

impl ColorOrdering for Amc {
    fn permutation(&self, graph: &Graph) -> Result<Permutation> {
        let coloring = greedy_coloring(graph);
        debug!("amc: n = {}, colors = {}", graph.n, coloring.n_colors);
        Ok(Permutation::amc(&coloring))
    }
}

/// Algebraic block multi-coloring
#[derive(Debug, Clone, Copy)]
pub struct Abmc {
    /// Rows per aggregated block
    pub block_size: usize,
    /// How rows are assigned to blocks
    pub method: BlockingMethod,
}

impl ColorOrdering for Abmc {
    fn permutation(&self, graph: &Graph) -> Result<Permutation> {
        let blocking = Blocking::build(graph, self.block_size, self.method)?;
        let block_graph = blocking.block_graph(graph);
        let coloring = greedy_coloring(&block_graph);
        debug!(
            "abmc: n = {}, blocks = {} of {} ({:?}), colors = {}",
            graph.n,
            blocking.n_blocks(),
            self.block_size,
            self.method,
            coloring.n_colors
        );
        Permutation::abmc(&blocking, &coloring)
    }
}

/// Resolves an ordering configuration to its implementation
pub fn ordering_for(config: &OrderingConfig) -> Box<dyn ColorOrdering + Send + Sync> {
    match *config {
        OrderingConfig::Amc => Box::new(Amc),
        OrderingConfig::Abmc { block_size, method } => Box::new(Abmc { block_size, method }),
    }
}

/// Reorders a square matrix for color-parallel solves
///
/// `a` must hold every stored entry explicitly (expand a symmetric matrix
/// first). With `Shape::Symmetric` its pattern is taken as structurally
/// symmetric and used directly as the graph; otherwise the pattern is
/// symmetrized.
///
/// # Returns
///
/// The permuted matrix P A Pᵀ and the permutation
pub fn reorder<T: Scalar>(
    a: &CsrMatrix<T>,
    config: &OrderingConfig,
    shape: Shape,
) -> Result<(CsrMatrix<T>, Permutation)> {
    a.check_structure()?;
    let graph = Graph::from_matrix(a, shape == Shape::Symmetric);
    let perm = ordering_for(config).permutation(&graph)?;
    let permuted = perm.permute_matrix(a)?;
    Ok((permuted, perm))
}

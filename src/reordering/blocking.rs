//! Grouping of rows into fixed-size blocks for block multi-coloring

use std::collections::VecDeque;

use crate::config::BlockingMethod;
use crate::error::{Result, StructuralError};
use crate::reordering::adjacency::Graph;

/// A partition of the vertices into blocks of equal size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocking {
    /// Vertices per block
    pub block_size: usize,
    /// Vertices listed block by block (size: n)
    pub members: Vec<usize>,
    /// Block owning each vertex (size: n)
    pub owner: Vec<usize>,
}

impl Blocking {
    /// Partitions the vertices of `graph` with the chosen method
    ///
    /// Fails with `BlockSizeMismatch` unless `block_size` divides the
    /// number of vertices. Pad the matrix first when it does not.
    pub fn build(graph: &Graph, block_size: usize, method: BlockingMethod) -> Result<Self> {
        if block_size == 0 || graph.n % block_size != 0 {
            return Err(StructuralError::BlockSizeMismatch {
                n: graph.n,
                block: block_size,
            }
            .into());
        }
        let blocking = match method {
            BlockingMethod::Simple => Self::simple(graph.n, block_size),
            BlockingMethod::Connected => Self::connected(graph, block_size),
        };
        Ok(blocking)
    }

    /// Consecutive index ranges: block b holds rows `b*bs..(b+1)*bs`
    fn simple(n: usize, block_size: usize) -> Self {
        Self {
            block_size,
            members: (0..n).collect(),
            owner: (0..n).map(|i| i / block_size).collect(),
        }
    }

    /// Grows each block breadth-first from its lowest unassigned vertex
    ///
    /// When the connected component runs out before the block is full, the
    /// search restarts from the next unassigned vertex in index order.
    fn connected(graph: &Graph, block_size: usize) -> Self {
        let n = graph.n;
        let mut owner = vec![usize::MAX; n];
        let mut members = Vec::with_capacity(n);
        let mut queue = VecDeque::new();
        let mut seed = 0;
        let mut block = 0;

        while members.len() < n {
            let mut filled = 0;
            while filled < block_size {
                while owner[seed] != usize::MAX {
                    seed += 1;
                }
                owner[seed] = block;
                members.push(seed);
                filled += 1;
                queue.clear();
                queue.push_back(seed);

                while let Some(v) = queue.pop_front() {
                    if filled == block_size {
                        break;
                    }
                    for &w in graph.neighbors(v) {
                        if filled == block_size {
                            break;
                        }
                        if owner[w] == usize::MAX {
                            owner[w] = block;
                            members.push(w);
                            filled += 1;
                            queue.push_back(w);
                        }
                    }
                }
            }
            block += 1;
        }

        Self {
            block_size,
            members,
            owner,
        }
    }

    /// Number of blocks
    pub fn n_blocks(&self) -> usize {
        self.members.len() / self.block_size
    }

    /// Vertices of block b
    pub fn block(&self, b: usize) -> &[usize] {
        &self.members[b * self.block_size..(b + 1) * self.block_size]
    }

    /// Quotient graph: blocks a and b are adjacent when any of their
    /// vertices are
    pub fn block_graph(&self, graph: &Graph) -> Graph {
        let n_blocks = self.n_blocks();
        let mut row_ptr = Vec::with_capacity(n_blocks + 1);
        let mut adj = Vec::new();
        let mut marker = vec![usize::MAX; n_blocks];
        row_ptr.push(0);

        for b in 0..n_blocks {
            let start = adj.len();
            for &v in self.block(b) {
                for &w in graph.neighbors(v) {
                    let ob = self.owner[w];
                    if marker[ob] != b {
                        marker[ob] = b;
                        adj.push(ob);
                    }
                }
            }
            adj[start..].sort_unstable();
            row_ptr.push(adj.len());
        }

        Graph {
            n: n_blocks,
            row_ptr,
            adj,
        }
    }
}

//! Greedy multi-color partitioning

use crate::reordering::adjacency::Graph;

/// Color assignment for the vertices of a graph
///
/// Colors are 1-based; every vertex of a finished coloring has a color in
/// `1..=n_colors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    /// Color of every vertex, starting at 1
    pub colors: Vec<usize>,
    /// Number of colors used
    pub n_colors: usize,
}

impl Coloring {
    /// Number of vertices carrying each color, indexed by `color - 1`
    pub fn color_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_colors];
        for &c in &self.colors {
            sizes[c - 1] += 1;
        }
        sizes
    }

    /// Returns true if no edge joins two distinct vertices of the same color
    pub fn is_valid(&self, graph: &Graph) -> bool {
        (0..graph.n).all(|u| {
            self.colors[u] >= 1
                && graph
                    .neighbors(u)
                    .iter()
                    .all(|&v| v == u || self.colors[v] != self.colors[u])
        })
    }
}

/// Colors a graph with greedy rounds
///
/// Round `r` scans the vertices in index order and gives color `r` to every
/// uncolored vertex not adjacent to one already colored `r` in this round.
/// Rounds repeat until every vertex is colored; the number of rounds is the
/// number of colors.
///
/// The graph must be symmetric for the result to be a proper coloring.
pub fn greedy_coloring(graph: &Graph) -> Coloring {
    let n = graph.n;
    let mut colors = vec![0usize; n];
    let mut visit = vec![0usize; n];
    let mut remaining = n;
    let mut round = 0;

    while remaining > 0 {
        round += 1;
        for i in 0..n {
            if colors[i] != 0 || visit[i] == round {
                continue;
            }
            colors[i] = round;
            remaining -= 1;
            for &j in graph.neighbors(i) {
                visit[j] = round;
            }
        }
    }

    Coloring {
        colors,
        n_colors: round,
    }
}

//! Matrix generators shared by the integration tests

#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sparse_krylov::CsrMatrix;

/// Random nonsymmetric matrix with a full diagonal
///
/// Each row gets up to `max_off` off-diagonal entries in [-1, 1]; the
/// diagonal exceeds the row's absolute off-diagonal sum by `margin`.
pub fn diagonally_dominant(n: usize, max_off: usize, margin: f64, seed: u64) -> CsrMatrix<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut triplets = Vec::new();

    for i in 0..n {
        let count = rng.gen_range(0..=max_off.min(n - 1));
        let mut cols = std::collections::BTreeSet::new();
        while cols.len() < count {
            let c = rng.gen_range(0..n);
            if c != i {
                cols.insert(c);
            }
        }
        let mut off_sum = 0.0;
        for c in cols {
            let v: f64 = rng.gen_range(-1.0..1.0);
            off_sum += v.abs();
            triplets.push((i, c, v));
        }
        triplets.push((i, i, off_sum + margin));
    }

    CsrMatrix::from_triplets(n, n, &triplets)
}

/// Random matrix whose pattern is structurally symmetric
pub fn structurally_symmetric(n: usize, max_off: usize, seed: u64) -> CsrMatrix<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut triplets = Vec::new();

    for i in 0..n {
        triplets.push((i, i, 2.0 * max_off as f64 + 1.0));
        for _ in 0..rng.gen_range(0..=max_off / 2) {
            let j = rng.gen_range(0..n);
            if j != i {
                triplets.push((i, j, rng.gen_range(-1.0..1.0)));
                triplets.push((j, i, rng.gen_range(-1.0..1.0)));
            }
        }
    }

    CsrMatrix::from_triplets(n, n, &triplets)
}

/// Five-point convection-diffusion operator on an m x m grid
pub fn convection_diffusion(m: usize, convection: f64) -> CsrMatrix<f64> {
    let n = m * m;
    let mut triplets = Vec::new();
    for i in 0..m {
        for j in 0..m {
            let r = i * m + j;
            triplets.push((r, r, 4.0));
            if i > 0 {
                triplets.push((r, r - m, -1.0 - convection));
            }
            if i + 1 < m {
                triplets.push((r, r + m, -1.0 + convection));
            }
            if j > 0 {
                triplets.push((r, r - 1, -1.0 - convection));
            }
            if j + 1 < m {
                triplets.push((r, r + 1, -1.0 + convection));
            }
        }
    }
    CsrMatrix::from_triplets(n, n, &triplets)
}

/// Deterministic right-hand side
pub fn rhs(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

pub fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol * (1.0 + e.abs()),
            "entry {}: {} vs {}",
            i,
            a,
            e
        );
    }
}

/// Kernel benchmarks: SpMV per format, sequential vs color-parallel
/// triangular solves, and ILU(0)
///
/// Usage:
///   cargo bench --bench kernels
///   GRID=400 cargo bench --bench kernels     (400 x 400 grid, 160k rows)
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sparse_krylov::trsv::{
    lower_solve_colored, lower_solve_in_place, upper_solve_colored, upper_solve_in_place,
};
use sparse_krylov::{ilu0, reorder, split, BlockingMethod, CsrMatrix, OrderingConfig, Shape, SplitPolicy};
use std::hint::black_box;
use std::time::Duration;

fn grid_size() -> usize {
    std::env::var("GRID")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(200)
}

/// Five-point convection-diffusion operator on an m x m grid
fn convection_diffusion(m: usize) -> CsrMatrix<f64> {
    let mut triplets = Vec::with_capacity(5 * m * m);
    for i in 0..m {
        for j in 0..m {
            let r = i * m + j;
            triplets.push((r, r, 4.0));
            if i > 0 {
                triplets.push((r, r - m, -1.3));
            }
            if i + 1 < m {
                triplets.push((r, r + m, -0.7));
            }
            if j > 0 {
                triplets.push((r, r - 1, -1.3));
            }
            if j + 1 < m {
                triplets.push((r, r + 1, -0.7));
            }
        }
    }
    CsrMatrix::from_triplets(m * m, m * m, &triplets)
}

fn bench_spmv(c: &mut Criterion) {
    let a = convection_diffusion(grid_size());
    let n = a.n_rows;
    let x = vec![1.0; n];
    let mut y = vec![0.0; n];

    let mut group = c.benchmark_group("spmv");
    group.measurement_time(Duration::from_secs(3));

    group.bench_function("csr", |b| b.iter(|| a.spmv(black_box(&x), &mut y)));

    for (bnl, bnw) in [(4, 1), (8, 1), (8, 2)] {
        if n % bnl != 0 {
            continue;
        }
        let bcsr = a.to_bcsr(bnl, bnw).unwrap();
        group.bench_with_input(
            BenchmarkId::new("bcsr", format!("{}x{}", bnl, bnw)),
            &bcsr,
            |b, m| b.iter(|| m.spmv(black_box(&x), &mut y)),
        );
    }

    for slice in [8, 32] {
        let sell = a.to_sell(slice).unwrap();
        group.bench_with_input(BenchmarkId::new("sell", slice), &sell, |b, m| {
            b.iter(|| m.spmv(black_box(&x), &mut y))
        });
    }
    group.finish();
}

fn bench_trsv(c: &mut Criterion) {
    let a = convection_diffusion(grid_size());
    let n = a.n_rows;
    let rhs = vec![1.0; n];

    let mut group = c.benchmark_group("trsv");
    group.measurement_time(Duration::from_secs(3));

    let mut factor = a.duplicate();
    ilu0(&mut factor).unwrap();
    let (l, u) = split(&factor, SplitPolicy::LDu, true).unwrap().into_l_du().unwrap();
    group.bench_function("sequential", |b| {
        b.iter(|| {
            let mut y = rhs.clone();
            lower_solve_in_place(&l, &mut y).unwrap();
            upper_solve_in_place(&u, &mut y).unwrap();
            black_box(y)
        })
    });

    let orderings = [
        ("amc", OrderingConfig::Amc),
        ("abmc_simple", OrderingConfig::Abmc { block_size: 8, method: BlockingMethod::Simple }),
        ("abmc_connect", OrderingConfig::Abmc { block_size: 8, method: BlockingMethod::Connected }),
    ];
    for (name, ordering) in orderings {
        let (mut factor, perm) = reorder(&a, &ordering, Shape::General).unwrap();
        ilu0(&mut factor).unwrap();
        let (l, u) = split(&factor, SplitPolicy::LDu, true).unwrap().into_l_du().unwrap();
        let schedule = perm.schedule().unwrap();
        println!("{}: {} colors", name, schedule.n_colors());

        group.bench_function(BenchmarkId::new("colored", name), |b| {
            b.iter(|| {
                let mut y = rhs.clone();
                lower_solve_colored(&l, &schedule, &mut y).unwrap();
                upper_solve_colored(&u, &schedule, &mut y).unwrap();
                black_box(y)
            })
        });
    }
    group.finish();
}

fn bench_ilu0(c: &mut Criterion) {
    let a = convection_diffusion(grid_size());
    let mut group = c.benchmark_group("ilu");
    group.sample_size(10);

    group.bench_function("ilu0", |b| {
        b.iter(|| {
            let mut f = a.duplicate();
            ilu0(&mut f).unwrap();
            black_box(f)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_spmv, bench_trsv, bench_ilu0);
criterion_main!(benches);

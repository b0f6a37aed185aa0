//! Preconditioners applied by the Krylov drivers
//!
//! Every preconditioner maps a residual r to z = M⁻¹ r. The ILU variants
//! hold the triangular factors of an incomplete factorization and apply
//! them by forward and backward substitution; the colored variants also
//! hold the permutation of their ordering, so they act on vectors in the
//! original ordering: M⁻¹ = Pᵀ (L'U')⁻¹ P.

use log::debug;

use crate::config::{OrderingConfig, PreconditionerConfig, PreconditionerKind, Shape, SplitPolicy};
use crate::error::{check_len, Result, SolverError};
use crate::ilu::{ilu0, ilup};
use crate::matrix::{pad_vector, split, BcsrMatrix, CsrMatrix};
use crate::reordering::{reorder, Permutation};
use crate::scalar::Scalar;
use crate::trsv::block::{self as block_trsv, validate_block_factor};
use crate::trsv::sequential::{self, validate_unit_lower, validate_upper};
use crate::trsv::colored::{
    lower_block_sweep_colored, lower_sweep_colored, upper_block_sweep_colored,
    upper_sweep_colored,
};
use crate::trsv::ColorSchedule;

/// Generic trait for preconditioners
///
/// Implementations are immutable once built and may be shared across the
/// threads of the solve.
pub trait Preconditioner<T: Scalar>: Send + Sync {
    /// Computes z = M⁻¹ r
    ///
    /// # Arguments
    ///
    /// * `r` - Input vector in the original ordering
    /// * `z` - Output vector, same length as `r`
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<()>;

    /// Short name used in log lines
    fn name(&self) -> &'static str;
}

/// No preconditioning: z = r
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T: Scalar> Preconditioner<T> for Identity {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<()> {
        check_len(r.len(), z.len())?;
        z.copy_from_slice(r);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Splits a factorized matrix into the factors the solves consume
fn solve_factors<T: Scalar>(
    factor: &CsrMatrix<T>,
    policy: SplitPolicy,
    invert_diagonal: bool,
) -> Result<(CsrMatrix<T>, CsrMatrix<T>)> {
    split(factor, policy, invert_diagonal)?.into_solve_factors()
}

/// ILU factors with sequential CSR triangular solves
#[derive(Debug, Clone)]
pub struct IluPreconditioner<T: Copy + num_traits::Num> {
    l: CsrMatrix<T>,
    u: CsrMatrix<T>,
}

impl<T: Scalar> IluPreconditioner<T> {
    /// Wraps an already factorized matrix (combined L\U storage)
    pub fn from_factor(
        factor: &CsrMatrix<T>,
        policy: SplitPolicy,
        invert_diagonal: bool,
    ) -> Result<Self> {
        let (l, u) = solve_factors(factor, policy, invert_diagonal)?;
        validate_unit_lower(&l)?;
        validate_upper(&u)?;
        Ok(Self { l, u })
    }

    /// ILU(0) of `a`; `a` itself is left untouched
    pub fn ilu0(a: &CsrMatrix<T>, config: &PreconditionerConfig) -> Result<Self> {
        let mut factor = a.duplicate();
        ilu0(&mut factor)?;
        Self::from_factor(&factor, config.split_policy, config.invert_diagonal)
    }

    /// ILU(p) of `a`; `a` itself is left untouched
    pub fn ilup(a: &CsrMatrix<T>, p: usize, config: &PreconditionerConfig) -> Result<Self> {
        let mut factor = a.duplicate();
        ilup(&mut factor, p)?;
        Self::from_factor(&factor, config.split_policy, config.invert_diagonal)
    }

    /// Unit-lower factor
    pub fn lower(&self) -> &CsrMatrix<T> {
        &self.l
    }

    /// Upper factor with inverted diagonal
    pub fn upper(&self) -> &CsrMatrix<T> {
        &self.u
    }
}

impl<T: Scalar> Preconditioner<T> for IluPreconditioner<T> {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<()> {
        check_len(self.l.n_rows, r.len())?;
        check_len(self.l.n_rows, z.len())?;
        z.copy_from_slice(r);
        sequential::lower_solve_in_place(&self.l, z)?;
        sequential::upper_solve_in_place(&self.u, z)
    }

    fn name(&self) -> &'static str {
        "ilu"
    }
}

fn check_block_shape(bnl: usize, bnw: usize) -> Result<()> {
    if bnl == 0 || bnw == 0 {
        return Err(SolverError::config("block dimensions must be at least 1"));
    }
    if bnl % bnw != 0 {
        return Err(SolverError::config(format!(
            "block height {} is not a multiple of block width {}",
            bnl, bnw
        )));
    }
    Ok(())
}

/// Block-filled ILU(0) followed by the BCSR conversion of both factors
///
/// `a` must already be padded to a multiple of `bnl`. Converting to BCSR and
/// back stores every position of a touched block, so the ILU(0) pattern
/// becomes the block pattern.
fn block_ilu_factors<T: Scalar>(
    a: &CsrMatrix<T>,
    bnl: usize,
    bnw: usize,
    config: &PreconditionerConfig,
    schedule: Option<&ColorSchedule>,
) -> Result<(BcsrMatrix<T>, BcsrMatrix<T>)> {
    let mut filled = a.to_bcsr(bnl, bnw)?.to_csr();
    debug!(
        "block fill {}x{}: nnz {} -> {}",
        bnl,
        bnw,
        a.nnz(),
        filled.nnz()
    );
    ilu0(&mut filled)?;

    let (l, u) = solve_factors(&filled, config.split_policy, config.invert_diagonal)?;
    let l = l.to_bcsr(bnl, bnw)?;
    let u = u.to_bcsr(bnl, bnw)?;
    match schedule {
        Some(schedule) => {
            schedule.validate_block_lower(&l)?;
            schedule.validate_block_upper(&u)?;
        }
        None => {
            validate_block_factor(&l, false)?;
            validate_block_factor(&u, true)?;
        }
    }
    Ok((l, u))
}

/// Block ILU(0) with sequential BCSR triangular solves
#[derive(Debug, Clone)]
pub struct BlockIluPreconditioner<T: Copy + num_traits::Num> {
    l: BcsrMatrix<T>,
    u: BcsrMatrix<T>,
    /// Dimension before padding
    n: usize,
}

impl<T: Scalar> BlockIluPreconditioner<T> {
    /// Pads `a` to a multiple of `bnl` and builds the block factors
    ///
    /// # Arguments
    ///
    /// * `a` - Square system matrix with every diagonal present
    /// * `bnl`, `bnw` - Block height and width; `bnl` must be a multiple of `bnw`
    /// * `config` - Split policy and diagonal inversion
    pub fn new(a: &CsrMatrix<T>, bnl: usize, bnw: usize, config: &PreconditionerConfig) -> Result<Self> {
        check_block_shape(bnl, bnw)?;
        a.check_structure()?;
        let mut padded = a.duplicate();
        padded.padding(bnl)?;
        let (l, u) = block_ilu_factors(&padded, bnl, bnw, config, None)?;
        Ok(Self { l, u, n: a.n_rows })
    }

    /// Block shape (height, width)
    pub fn block_shape(&self) -> (usize, usize) {
        (self.l.bnl, self.l.bnw)
    }
}

impl<T: Scalar> Preconditioner<T> for BlockIluPreconditioner<T> {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<()> {
        check_len(self.n, r.len())?;
        check_len(self.n, z.len())?;
        let mut work = pad_vector(r, self.l.n_rows);
        block_trsv::lower_solve_in_place(&self.l, &mut work)?;
        block_trsv::upper_solve_in_place(&self.u, &mut work)?;
        z.copy_from_slice(&work[..self.n]);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "block-ilu"
    }
}

/// Pads `a` when the ordering aggregates rows into blocks
fn pad_for_ordering<T: Scalar>(a: &CsrMatrix<T>, ordering: &OrderingConfig) -> Result<CsrMatrix<T>> {
    let mut padded = a.duplicate();
    if let OrderingConfig::Abmc { block_size, .. } = *ordering {
        padded.padding(block_size)?;
    }
    Ok(padded)
}

/// Runs r through P, the two triangular solves, and Pᵀ
fn apply_permuted<T: Scalar>(
    perm: &Permutation,
    n: usize,
    r: &[T],
    z: &mut [T],
    solve: impl FnOnce(&mut [T]) -> Result<()>,
) -> Result<()> {
    check_len(n, r.len())?;
    check_len(n, z.len())?;
    let padded = pad_vector(r, perm.len());
    let mut work = vec![T::zero(); perm.len()];
    perm.permute_vector(&padded, &mut work)?;
    solve(&mut work)?;

    let mut back = vec![T::zero(); perm.len()];
    perm.unpermute_vector(&work, &mut back)?;
    z.copy_from_slice(&back[..n]);
    Ok(())
}

/// ILU(0) of the reordered matrix with color-parallel CSR solves
#[derive(Debug, Clone)]
pub struct ColoredIluPreconditioner<T: Copy + num_traits::Num> {
    perm: Permutation,
    schedule: ColorSchedule,
    l: CsrMatrix<T>,
    u: CsrMatrix<T>,
    n: usize,
}

impl<T: Scalar> ColoredIluPreconditioner<T> {
    /// Reorders `a`, factorizes the permuted matrix and checks the schedule
    ///
    /// `fill` selects ILU(0) when 0 and level-`fill` ILU otherwise.
    ///
    /// # Returns
    ///
    /// `BlockSizeMismatch` from the ordering, `ZeroPivot` from the
    /// factorization, or `ColorConflict` if the factors (fill included)
    /// couple two units of one color.
    pub fn new(
        a: &CsrMatrix<T>,
        ordering: &OrderingConfig,
        fill: usize,
        shape: Shape,
        config: &PreconditionerConfig,
    ) -> Result<Self> {
        let padded = pad_for_ordering(a, ordering)?;
        let (mut factor, perm) = reorder(&padded, ordering, shape)?;
        if fill == 0 {
            ilu0(&mut factor)?;
        } else {
            ilup(&mut factor, fill)?;
        }

        let (l, u) = solve_factors(&factor, config.split_policy, config.invert_diagonal)?;
        let schedule = perm.schedule()?;
        schedule.validate_lower(&l)?;
        schedule.validate_upper(&u)?;

        debug!(
            "colored ilu({}): n = {}, colors = {}, unit = {}",
            fill,
            perm.len(),
            schedule.n_colors(),
            schedule.unit()
        );
        Ok(Self {
            perm,
            schedule,
            l,
            u,
            n: a.n_rows,
        })
    }

    /// The ordering's permutation
    pub fn permutation(&self) -> &Permutation {
        &self.perm
    }

    /// Number of colors in the schedule
    pub fn n_colors(&self) -> usize {
        self.schedule.n_colors()
    }
}

impl<T: Scalar> Preconditioner<T> for ColoredIluPreconditioner<T> {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<()> {
        apply_permuted(&self.perm, self.n, r, z, |y| {
            lower_sweep_colored(&self.l, &self.schedule, y);
            upper_sweep_colored(&self.u, &self.schedule, y);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "colored-ilu"
    }
}

/// Block ILU(0) of the ABMC-reordered matrix with color-parallel BCSR solves
#[derive(Debug, Clone)]
pub struct ColoredBlockIluPreconditioner<T: Copy + num_traits::Num> {
    perm: Permutation,
    schedule: ColorSchedule,
    l: BcsrMatrix<T>,
    u: BcsrMatrix<T>,
    n: usize,
}

impl<T: Scalar> ColoredBlockIluPreconditioner<T> {
    /// Builds the colored block factors
    ///
    /// The ordering must be ABMC with a block size equal to `bnl`, so that
    /// every ordering block is one block row of the factors.
    pub fn new(
        a: &CsrMatrix<T>,
        ordering: &OrderingConfig,
        bnl: usize,
        bnw: usize,
        shape: Shape,
        config: &PreconditionerConfig,
    ) -> Result<Self> {
        check_block_shape(bnl, bnw)?;
        match *ordering {
            OrderingConfig::Abmc { block_size, .. } if block_size == bnl => {}
            OrderingConfig::Abmc { block_size, .. } => {
                return Err(SolverError::config(format!(
                    "ABMC block size {} must equal the block height {}",
                    block_size, bnl
                )))
            }
            OrderingConfig::Amc => {
                return Err(SolverError::config(
                    "colored block ILU needs an ABMC ordering",
                ))
            }
        }

        let padded = pad_for_ordering(a, ordering)?;
        let (permuted, perm) = reorder(&padded, ordering, shape)?;
        let schedule = perm.schedule()?;
        let (l, u) = block_ilu_factors(&permuted, bnl, bnw, config, Some(&schedule))?;

        debug!(
            "colored block ilu: n = {}, colors = {}, blocks {}x{}",
            perm.len(),
            schedule.n_colors(),
            bnl,
            bnw
        );
        Ok(Self {
            perm,
            schedule,
            l,
            u,
            n: a.n_rows,
        })
    }

    /// Number of colors in the schedule
    pub fn n_colors(&self) -> usize {
        self.schedule.n_colors()
    }
}

impl<T: Scalar> Preconditioner<T> for ColoredBlockIluPreconditioner<T> {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<()> {
        apply_permuted(&self.perm, self.n, r, z, |y| {
            lower_block_sweep_colored(&self.l, &self.schedule, y);
            upper_block_sweep_colored(&self.u, &self.schedule, y);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "colored-block-ilu"
    }
}

/// Assembles the preconditioner selected by `config`
///
/// # Arguments
///
/// * `a` - Prepared system matrix (see [`crate::prepare_system`])
/// * `config` - Preconditioner family, split policy and diagonal inversion
/// * `shape` - Whether the pattern of `a` is structurally symmetric
pub fn build_preconditioner<T: Scalar>(
    a: &CsrMatrix<T>,
    config: &PreconditionerConfig,
    shape: Shape,
) -> Result<Box<dyn Preconditioner<T>>> {
    let preconditioner: Box<dyn Preconditioner<T>> = match config.kind {
        PreconditionerKind::None => Box::new(Identity),
        PreconditionerKind::Ilu0 => Box::new(IluPreconditioner::ilu0(a, config)?),
        PreconditionerKind::Ilup(p) => Box::new(IluPreconditioner::ilup(a, p, config)?),
        PreconditionerKind::BlockIlu { bnl, bnw } => {
            Box::new(BlockIluPreconditioner::new(a, bnl, bnw, config)?)
        }
        PreconditionerKind::Colored { ordering, fill } => {
            Box::new(ColoredIluPreconditioner::new(a, &ordering, fill, shape, config)?)
        }
        PreconditionerKind::ColoredBlock { ordering, bnl, bnw } => Box::new(
            ColoredBlockIluPreconditioner::new(a, &ordering, bnl, bnw, shape, config)?,
        ),
    };
    debug!("preconditioner: {}", preconditioner.name());
    Ok(preconditioner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockingMethod;
    use crate::error::StructuralError;

    /// Nonsymmetric convection-diffusion style operator on an m x m grid
    fn grid(m: usize) -> CsrMatrix<f64> {
        let n = m * m;
        let mut triplets = Vec::new();
        for i in 0..m {
            for j in 0..m {
                let r = i * m + j;
                triplets.push((r, r, 8.0));
                if i > 0 {
                    triplets.push((r, r - m, -1.2));
                }
                if i + 1 < m {
                    triplets.push((r, r + m, -0.8));
                }
                if j > 0 {
                    triplets.push((r, r - 1, -1.1));
                }
                if j + 1 < m {
                    triplets.push((r, r + 1, -0.9));
                }
            }
        }
        CsrMatrix::from_triplets(n, n, &triplets)
    }

    /// ||A z - r|| / ||r|| for z = M⁻¹ r
    fn apply_error(a: &CsrMatrix<f64>, m: &dyn Preconditioner<f64>) -> f64 {
        let r: Vec<f64> = (0..a.n_rows).map(|i| 1.0 + (i % 7) as f64).collect();
        let mut z = vec![0.0; a.n_rows];
        m.apply(&r, &mut z).unwrap();
        let mut az = vec![0.0; a.n_rows];
        a.spmv(&z, &mut az).unwrap();
        let num: f64 = az.iter().zip(&r).map(|(x, y)| (x - y) * (x - y)).sum();
        let den: f64 = r.iter().map(|x| x * x).sum();
        (num / den).sqrt()
    }

    #[test]
    fn test_identity() {
        let r = vec![1.0, -2.0, 3.0];
        let mut z = vec![0.0; 3];
        Preconditioner::<f64>::apply(&Identity, &r, &mut z).unwrap();
        assert_eq!(z, r);
    }

    #[test]
    fn test_all_kinds_approximate_inverse() {
        // 49 rows: not a multiple of any block size below, exercising padding
        let a = grid(7);
        let ordering = OrderingConfig::Abmc {
            block_size: 4,
            method: BlockingMethod::Simple,
        };
        let kinds = [
            PreconditionerKind::Ilu0,
            PreconditionerKind::Ilup(2),
            PreconditionerKind::BlockIlu { bnl: 4, bnw: 2 },
            PreconditionerKind::colored(OrderingConfig::Amc),
            PreconditionerKind::colored(ordering),
            PreconditionerKind::ColoredBlock {
                ordering,
                bnl: 4,
                bnw: 1,
            },
        ];
        for kind in kinds {
            let m = build_preconditioner(&a, &PreconditionerConfig::new(kind), Shape::General).unwrap();
            let err = apply_error(&a, m.as_ref());
            assert!(err < 0.3, "{:?}: {}", kind, err);
        }
    }

    #[test]
    fn test_colored_matches_sequential_on_permuted_system() {
        // the colored preconditioner equals plain ILU(0) of P A Pᵀ, mapped back
        let a = grid(6);
        let config = PreconditionerConfig::default();
        let colored = ColoredIluPreconditioner::new(&a, &OrderingConfig::Amc, 0, Shape::General, &config).unwrap();

        let pa = colored.permutation().permute_matrix(&a).unwrap();
        let plain = IluPreconditioner::ilu0(&pa, &config).unwrap();

        let r: Vec<f64> = (0..36).map(|i| (i as f64).sin()).collect();
        let mut pr = vec![0.0; 36];
        colored.permutation().permute_vector(&r, &mut pr).unwrap();
        let mut pz = vec![0.0; 36];
        plain.apply(&pr, &mut pz).unwrap();
        let mut expected = vec![0.0; 36];
        colored.permutation().unpermute_vector(&pz, &mut expected).unwrap();

        let mut z = vec![0.0; 36];
        colored.apply(&r, &mut z).unwrap();
        for (x, y) in z.iter().zip(&expected) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    fn tridiagonal(n: usize) -> CsrMatrix<f64> {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 4.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.5));
            }
        }
        CsrMatrix::from_triplets(n, n, &triplets)
    }

    #[test]
    fn test_colored_fill_matches_sequential_ilup() {
        // blocks of a path: fill from a neighbor block lands in an earlier color
        let a = tridiagonal(32);
        let ordering = OrderingConfig::Abmc {
            block_size: 4,
            method: BlockingMethod::Simple,
        };
        let config = PreconditionerConfig::new(PreconditionerKind::Colored { ordering, fill: 1 });
        let colored = ColoredIluPreconditioner::new(&a, &ordering, 1, Shape::General, &config).unwrap();
        assert_eq!(colored.n_colors(), 2);

        let pa = colored.permutation().permute_matrix(&a).unwrap();
        let ilu0_nnz = IluPreconditioner::ilu0(&pa, &config).unwrap().lower().nnz();
        let plain = IluPreconditioner::ilup(&pa, 1, &config).unwrap();
        assert!(plain.lower().nnz() > ilu0_nnz);

        let r: Vec<f64> = (0..32).map(|i| (i as f64).cos()).collect();
        let mut pr = vec![0.0; 32];
        colored.permutation().permute_vector(&r, &mut pr).unwrap();
        let mut pz = vec![0.0; 32];
        plain.apply(&pr, &mut pz).unwrap();
        let mut expected = vec![0.0; 32];
        colored.permutation().unpermute_vector(&pz, &mut expected).unwrap();

        let mut z = vec![0.0; 32];
        colored.apply(&r, &mut z).unwrap();
        for (x, y) in z.iter().zip(&expected) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_colored_fill_across_one_color_is_rejected() {
        // red-black: eliminating a red pivot couples two black rows
        let a = tridiagonal(8);
        let kind = PreconditionerKind::Colored {
            ordering: OrderingConfig::Amc,
            fill: 1,
        };
        let result = build_preconditioner(&a, &PreconditionerConfig::new(kind), Shape::General);
        assert!(matches!(
            result,
            Err(SolverError::Structural(StructuralError::ColorConflict { .. }))
        ));

        let level0 = PreconditionerConfig::new(PreconditionerKind::colored(OrderingConfig::Amc));
        assert!(build_preconditioner(&a, &level0, Shape::General).is_ok());
    }

    #[test]
    fn test_colored_block_requires_matching_abmc() {
        let a = grid(4);
        let config = PreconditionerConfig::default();
        let amc = ColoredBlockIluPreconditioner::new(&a, &OrderingConfig::Amc, 4, 1, Shape::General, &config);
        assert!(matches!(amc, Err(SolverError::InvalidConfiguration(_))));

        let ordering = OrderingConfig::Abmc {
            block_size: 2,
            method: BlockingMethod::Simple,
        };
        let mismatch = ColoredBlockIluPreconditioner::new(&a, &ordering, 4, 1, Shape::General, &config);
        assert!(matches!(mismatch, Err(SolverError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_block_ilu_rejects_uneven_shape() {
        let a = grid(4);
        let result = BlockIluPreconditioner::new(&a, 2, 4, &PreconditionerConfig::default());
        assert!(matches!(result, Err(SolverError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_zero_pivot_propagates() {
        let a = CsrMatrix::new(2, 2, vec![0, 2, 4], vec![0, 1, 0, 1], vec![0.0, 1.0, 1.0, 1.0]);
        let result = build_preconditioner(&a, &PreconditionerConfig::default(), Shape::General);
        assert!(matches!(result, Err(SolverError::ZeroPivot { row: 0 })));
    }

    #[test]
    fn test_exact_on_diagonal_matrix() {
        let a = CsrMatrix::from_diagonal(&[4.0_f64, 9.0, 16.0]);
        let m = build_preconditioner(&a, &PreconditionerConfig::default(), Shape::Symmetric).unwrap();
        let mut z = vec![0.0; 3];
        m.apply(&[4.0, 9.0, 16.0], &mut z).unwrap();
        for v in z {
            assert!((v - 1.0).abs() < 1e-15);
        }
    }
}

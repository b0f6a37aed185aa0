//! Configuration and system parameters for the solver stack

use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_BLOCK_HEIGHT, DEFAULT_BLOCK_WIDTH, DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_OUTER_ITERATIONS, DEFAULT_ORDERING_BLOCK_SIZE, DEFAULT_RESTART,
};
use crate::error::{Result, SolverError};

/// Declared shape of the input matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Only one triangle (including the diagonal) is stored; the other is implied
    Symmetric,
    /// Every nonzero is stored explicitly
    General,
}

/// How much the Krylov drivers report through the `log` facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Nothing is logged
    Silent,
    /// One `info` line per solve
    Summary,
    /// A `debug` line per iteration on top of the summary
    Iterations,
}

/// Krylov method selector used by [`crate::solve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Restarted GMRES(m)
    Gmres,
    /// BiCGStab
    BiCgStab,
    /// Restarted GCR(m)
    Gcr,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Gmres => "GMRES",
            Method::BiCgStab => "BiCGStab",
            Method::Gcr => "GCR",
        };
        f.write_str(name)
    }
}

impl FromStr for Method {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gmres" => Ok(Method::Gmres),
            "bicgstab" => Ok(Method::BiCgStab),
            "gcr" => Ok(Method::Gcr),
            other => Err(SolverError::config(format!("unknown method '{}'", other))),
        }
    }
}

/// How the nonzeros of a factorized matrix are distributed over L, D and U
///
/// The variant decides which logical part shares a buffer with which:
///
/// | policy  | L buffer     | U buffer     | D buffer |
/// |---------|--------------|--------------|----------|
/// | `LD-U`  | strict L + D | strict U     | none     |
/// | `L-DU`  | strict L     | D + strict U | none     |
/// | `L-D-U` | strict L     | strict U     | D        |
/// | `LU-D`  | strict L + strict U (one buffer) | | D  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Diagonal folded into L
    LdU,
    /// Diagonal folded into U
    LDu,
    /// Three separate parts
    LDU,
    /// L and U share one buffer, diagonal separate
    LuD,
}

impl SplitPolicy {
    /// The key this policy is selected by
    pub fn key(&self) -> &'static str {
        match self {
            SplitPolicy::LdU => "LD-U",
            SplitPolicy::LDu => "L-DU",
            SplitPolicy::LDU => "L-D-U",
            SplitPolicy::LuD => "LU-D",
        }
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SplitPolicy {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LD-U" => Ok(SplitPolicy::LdU),
            "L-DU" => Ok(SplitPolicy::LDu),
            "L-D-U" => Ok(SplitPolicy::LDU),
            "LU-D" => Ok(SplitPolicy::LuD),
            other => Err(SolverError::config(format!("unknown split policy '{}'", other))),
        }
    }
}

/// Row-to-block assignment used by the ABMC ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingMethod {
    /// Contiguous index ranges of `block_size` rows
    Simple,
    /// Breadth-first growth from unassigned seeds
    Connected,
}

impl FromStr for BlockingMethod {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(BlockingMethod::Simple),
            "connect" => Ok(BlockingMethod::Connected),
            other => Err(SolverError::config(format!("unknown blocking method '{}'", other))),
        }
    }
}

/// Multi-color ordering applied before a color-parallel triangular solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingConfig {
    /// One vertex per row
    Amc,
    /// Rows aggregated into blocks, blocks colored
    Abmc {
        /// Rows per block; must divide the matrix dimension
        block_size: usize,
        /// How rows are assigned to blocks
        method: BlockingMethod,
    },
}

impl Default for OrderingConfig {
    fn default() -> Self {
        OrderingConfig::Abmc {
            block_size: DEFAULT_ORDERING_BLOCK_SIZE,
            method: BlockingMethod::Simple,
        }
    }
}

/// Which preconditioner [`crate::build_preconditioner`] assembles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionerKind {
    /// Unpreconditioned
    None,
    /// ILU(0) with sequential triangular solves
    Ilu0,
    /// ILU(p) with sequential triangular solves
    Ilup(usize),
    /// Block-filled ILU(0) with BCSR triangular solves
    BlockIlu {
        /// Block height
        bnl: usize,
        /// Block width
        bnw: usize,
    },
    /// ILU(`fill`) of the reordered matrix with color-parallel solves
    ///
    /// Fill that couples two units of one color is rejected when the
    /// preconditioner is built.
    Colored {
        /// AMC or ABMC ordering
        ordering: OrderingConfig,
        /// Fill level; 0 gives ILU(0)
        fill: usize,
    },
    /// Block ILU(0) of the ABMC-reordered matrix with color-parallel BCSR solves
    ColoredBlock {
        /// ABMC ordering; its block size must equal `bnl`
        ordering: OrderingConfig,
        /// Block height
        bnl: usize,
        /// Block width
        bnw: usize,
    },
}

impl PreconditionerKind {
    /// Colored ILU(0) under `ordering`
    pub fn colored(ordering: OrderingConfig) -> Self {
        PreconditionerKind::Colored { ordering, fill: 0 }
    }
}

/// Preconditioner construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreconditionerConfig {
    /// Preconditioner family
    pub kind: PreconditionerKind,
    /// How the factorized matrix is split into its triangular factors
    pub split_policy: SplitPolicy,
    /// Store the diagonal inverted
    pub invert_diagonal: bool,
}

impl Default for PreconditionerConfig {
    fn default() -> Self {
        Self {
            kind: PreconditionerKind::Ilu0,
            split_policy: SplitPolicy::LDu,
            invert_diagonal: true,
        }
    }
}

impl PreconditionerConfig {
    /// Creates a configuration for the given kind with the default split
    pub fn new(kind: PreconditionerKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Default block shape used by the block pipeline
    pub fn default_block() -> Self {
        Self::new(PreconditionerKind::BlockIlu {
            bnl: DEFAULT_BLOCK_HEIGHT,
            bnw: DEFAULT_BLOCK_WIDTH,
        })
    }

    /// Set the split policy
    pub fn with_split_policy(mut self, policy: SplitPolicy) -> Self {
        self.split_policy = policy;
        self
    }

    /// Set whether the diagonal is stored inverted
    pub fn with_invert_diagonal(mut self, invert: bool) -> Self {
        self.invert_diagonal = invert;
        self
    }
}

/// System parameters for parallel execution
#[derive(Debug, Clone)]
pub struct SystemParameters {
    /// Number of threads to use
    pub n_threads: usize,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(), // Use all available cores
        }
    }
}

/// Configuration for one Krylov solve
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Restart cycles for GMRES(m) and GCR(m)
    pub max_outer_iterations: usize,

    /// Iteration budget for BiCGStab
    pub max_iterations: usize,

    /// Restart length m
    pub restart: usize,

    /// Relative residual tolerance: converged once ||r|| < epsilon * ||b||
    pub epsilon: f64,

    /// Logging level of the drivers
    pub verbosity: Verbosity,

    /// System parameters for parallel execution
    pub system_params: SystemParameters,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: DEFAULT_MAX_OUTER_ITERATIONS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            restart: DEFAULT_RESTART,
            epsilon: DEFAULT_EPSILON,
            verbosity: Verbosity::Silent,
            system_params: SystemParameters::default(),
        }
    }
}

impl SolverConfig {
    /// Set the relative residual tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the restart length
    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }

    /// Set the number of restart cycles
    pub fn with_max_outer_iterations(mut self, cycles: usize) -> Self {
        self.max_outer_iterations = cycles;
        self
    }

    /// Set the BiCGStab iteration budget
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the logging level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the number of worker threads
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.system_params.n_threads = n_threads;
        self
    }

    /// Rejects parameters no driver can run with
    pub fn validate(&self) -> Result<()> {
        if self.restart == 0 {
            return Err(SolverError::config("restart length must be at least 1"));
        }
        if !(self.epsilon > 0.0) {
            return Err(SolverError::config(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.system_params.n_threads == 0 {
            return Err(SolverError::config("n_threads must be at least 1"));
        }
        Ok(())
    }
}

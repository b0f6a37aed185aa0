//! Centralized constants for the solver stack
//!
//! Defaults for the configuration surface and thresholds used by the
//! kernels live here rather than scattered throughout the code.

// ============================================================================
// KRYLOV DRIVER DEFAULTS
// ============================================================================

/// Default relative residual tolerance ||r|| < eps * ||b||
pub const DEFAULT_EPSILON: f64 = 1.0e-8;

/// Default total iteration budget
pub const DEFAULT_MAX_ITERATIONS: usize = 6000;

/// Default restart length m for GMRES(m) and GCR(m)
pub const DEFAULT_RESTART: usize = 50;

/// Default number of restart cycles (iteration budget / restart length)
pub const DEFAULT_MAX_OUTER_ITERATIONS: usize = DEFAULT_MAX_ITERATIONS / DEFAULT_RESTART;

// ============================================================================
// BLOCKING DEFAULTS
// ============================================================================

/// Default BCSR block height
pub const DEFAULT_BLOCK_HEIGHT: usize = 8;

/// Default BCSR block width
pub const DEFAULT_BLOCK_WIDTH: usize = 1;

/// Default ABMC ordering block size
pub const DEFAULT_ORDERING_BLOCK_SIZE: usize = 8;

/// Byte alignment of BCSR value storage
pub const BLOCK_VALUE_ALIGN: usize = 64;

// ============================================================================
// FILL-IN ACCUMULATOR
// ============================================================================

/// Initial capacity of a level-p fill accumulator row
pub const FILL_ROW_INITIAL_CAPACITY: usize = 8;

// ============================================================================
// PARALLELISM THRESHOLDS
// ============================================================================

/// Minimum vector length before dense kernels go parallel
pub const PARALLEL_VECTOR_THRESHOLD: usize = 8192;

/// Minimum row count before SpMV goes parallel
pub const PARALLEL_SPMV_THRESHOLD: usize = 2048;

// ============================================================================
// DISPLAY AND DEBUG CONSTANTS
// ============================================================================

/// Maximum rows to print in debug display
pub const MAX_DISPLAY_ROWS: usize = 5;

/// Maximum elements per row in debug display
pub const MAX_DISPLAY_ELEMENTS_PER_ROW: usize = 5;

//! Centralized constants for the amgcore kernels
//!
//! All hardcoded constants used throughout the codebase live here.
//! Constants are organized by category for easy reference and maintenance.

// ============================================================================
// HASH TABLE CONSTANTS
// ============================================================================

/// Sentinel stored in an unoccupied hash slot
pub const EMPTY_KEY: usize = usize::MAX;

/// Capacity of the per-worker small hash table (must be a power of two)
pub const DEFAULT_SMALL_TABLE_SIZE: usize = 128;

/// Modulus used to derive the double-hashing step from a key
pub const DOUBLE_HASH_MODULUS: usize = 61;

/// Intermediate products above which one row is filled by several workers
pub const DEFAULT_INTRA_ROW_PARALLEL_THRESHOLD: usize = 4096;

// ============================================================================
// COARSENING CONSTANTS
// ============================================================================

/// Measures below this value never enter the independent set
pub const MIN_SELECTABLE_MEASURE: f64 = 1.0;

/// Default seed for the measure jitter generator
pub const DEFAULT_COARSEN_SEED: u64 = 2747;

/// Default strength threshold for the classical strength filter
pub const DEFAULT_STRENGTH_THRESHOLD: f64 = 0.25;

// ============================================================================
// MESSAGE TAGS
// ============================================================================

/// Tag for real-valued ghost exchanges (measures)
pub const TAG_REAL: u32 = 1;

/// Tag for reverse (ghost to owner) real-valued exchanges
pub const TAG_REAL_REVERSE: u32 = 2;

/// Tag for integer ghost exchanges
pub const TAG_INT: u32 = 11;

/// Tag for CF marker ghost exchanges
pub const TAG_CF_MARKER: u32 = 12;

/// Tag for communication package construction requests
pub const TAG_COMM_PKG: u32 = 20;

/// Tag for all-reduce contributions
pub const TAG_ALL_REDUCE: u32 = 30;

// ============================================================================
// DISPLAY AND DEBUG CONSTANTS
// ============================================================================

/// Maximum rows to print in debug display
pub const MAX_DISPLAY_ROWS: usize = 5;

/// Maximum elements per row in debug display
pub const MAX_DISPLAY_ELEMENTS_PER_ROW: usize = 5;

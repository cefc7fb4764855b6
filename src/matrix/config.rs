//! Configuration for the SpGEMM and coarsening kernels

use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_COARSEN_SEED, DEFAULT_INTRA_ROW_PARALLEL_THRESHOLD, DEFAULT_SMALL_TABLE_SIZE,
    DOUBLE_HASH_MODULUS,
};
use crate::error::{AmgError, Result};

/// Open-addressing probe scheme used by the SpGEMM hash tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    /// Step to the next slot ('L')
    Linear,
    /// Triangular offsets 1, 2, 3, ... ('Q')
    Quadratic,
    /// Key-dependent odd step ('D')
    Double,
}

impl HashType {
    /// All supported schemes
    pub const ALL: [HashType; 3] = [HashType::Linear, HashType::Quadratic, HashType::Double];

    /// Parses the single-character scheme identifier
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            'L' | 'l' => Ok(HashType::Linear),
            'Q' | 'q' => Ok(HashType::Quadratic),
            'D' | 'd' => Ok(HashType::Double),
            other => Err(AmgError::UnknownHashType(other.to_string())),
        }
    }

    /// Single-character identifier of this scheme
    pub fn as_char(&self) -> char {
        match self {
            HashType::Linear => 'L',
            HashType::Quadratic => 'Q',
            HashType::Double => 'D',
        }
    }

    /// Slot visited on probe `attempt` (0-based) of `key` in a table of
    /// power-of-two `capacity`, given the slot `prev` of the previous probe
    ///
    /// Every scheme visits each slot exactly once over `capacity` probes.
    #[inline]
    pub fn probe(&self, capacity: usize, key: usize, attempt: usize, prev: usize) -> usize {
        let mask = capacity - 1;
        if attempt == 0 {
            return key & mask;
        }
        match self {
            HashType::Linear => (prev + 1) & mask,
            HashType::Quadratic => (prev + attempt) & mask,
            HashType::Double => (prev + double_hash_step(key)) & mask,
        }
    }
}

#[inline]
fn double_hash_step(key: usize) -> usize {
    2 * (key % DOUBLE_HASH_MODULUS) + 1
}

impl FromStr for HashType {
    type Err = AmgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "linear" => Ok(HashType::Linear),
            "q" | "quadratic" => Ok(HashType::Quadratic),
            "d" | "double" => Ok(HashType::Double),
            _ => Err(AmgError::UnknownHashType(s.to_string())),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// How the first SpGEMM attempt sizes the per-row global hash tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowNnzEstimate {
    /// No estimate: the first attempt only uses the small table
    None,
    /// Upper bound min(sum of B row lengths, n_cols); no row overflows
    UpperBound,
}

/// What to do when a row overflows on the second SpGEMM attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail the multiplication with [`AmgError::HashOverflow`]
    Error,
    /// Keep the entries that fit and count the row in the statistics
    Truncate,
}

/// Configuration for the hash-table SpGEMM kernel
#[derive(Debug, Clone)]
pub struct SpgemmConfig {
    /// Probe scheme for both table tiers
    pub hash_type: HashType,

    /// Capacity of the per-worker small table (power of two)
    pub small_table_size: usize,

    /// Row nnz estimation used by the first attempt
    pub row_estimate: RowNnzEstimate,

    /// Behavior on second-attempt overflow
    pub overflow_policy: OverflowPolicy,

    /// Rows with more intermediate products than this are filled by
    /// several workers concurrently
    pub intra_row_parallel_threshold: usize,
}

impl Default for SpgemmConfig {
    fn default() -> Self {
        Self {
            hash_type: HashType::Double,
            small_table_size: DEFAULT_SMALL_TABLE_SIZE,
            row_estimate: RowNnzEstimate::None,
            overflow_policy: OverflowPolicy::Error,
            intra_row_parallel_threshold: DEFAULT_INTRA_ROW_PARALLEL_THRESHOLD,
        }
    }
}

impl SpgemmConfig {
    /// Create a config using the given probe scheme
    pub fn with_hash_type(hash_type: HashType) -> Self {
        Self {
            hash_type,
            ..Self::default()
        }
    }

    /// Checks that table sizes are usable
    pub fn validate(&self) -> Result<()> {
        if self.small_table_size == 0 || !self.small_table_size.is_power_of_two() {
            return Err(AmgError::InvalidConfig(format!(
                "small_table_size must be a non-zero power of two, got {}",
                self.small_table_size
            )));
        }
        Ok(())
    }
}

/// Initialization mode of the PMIS coarsening
///
/// The integer codes match the values callers pass through the
/// traditional integer interface; see [`CfInit::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfInit {
    /// Start from scratch; rows without strong connections become strong fine
    Fresh,
    /// Start from caller-supplied markers and skip the first independent set
    Preset,
    /// Like `Fresh`, but rows without strong connections become coarse
    /// (codes 3 and 4)
    IsolatedCoarse,
}

impl CfInit {
    /// Maps an integer mode code (0, 1, 3 or 4) to a mode
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(CfInit::Fresh),
            1 => Ok(CfInit::Preset),
            3 | 4 => Ok(CfInit::IsolatedCoarse),
            other => Err(AmgError::InvalidCfInit(other)),
        }
    }

    /// Integer code of this mode
    pub fn code(&self) -> i32 {
        match self {
            CfInit::Fresh => 0,
            CfInit::Preset => 1,
            CfInit::IsolatedCoarse => 3,
        }
    }
}

/// Configuration for the PMIS coarsening driver
#[derive(Debug, Clone)]
pub struct CoarsenConfig {
    /// Initialization mode
    pub cf_init: CfInit,

    /// Seed for the measure jitter; each rank offsets it by its rank
    pub seed: u64,

    /// Iteration bound; `None` uses the global row count plus one
    pub max_iterations: Option<usize>,
}

impl Default for CoarsenConfig {
    fn default() -> Self {
        Self {
            cf_init: CfInit::Fresh,
            seed: DEFAULT_COARSEN_SEED,
            max_iterations: None,
        }
    }
}

impl CoarsenConfig {
    /// Create a config with the given seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

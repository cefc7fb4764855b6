//! # amgcore: setup kernels for distributed algebraic multigrid
//!
//! amgcore provides the two kernels that dominate the setup phase of an
//! algebraic multigrid (AMG) hierarchy for sparse systems from discretized
//! PDEs:
//!
//! - **PMIS coarsening**: splits the rows of a distributed strength graph
//!   into coarse and fine points by repeatedly selecting a randomized
//!   independent set.
//! - **Hash SpGEMM**: a row-parallel sparse matrix-matrix product that
//!   accumulates each output row in open-addressing hash tables, used to
//!   form coarse operators `R * A * P`. A sort-based sparse transpose
//!   provides `R = transpose(P)`.
//!
//! ## Algorithm Components
//!
//! 1. **Hash tables** ([`hash`]): lock-free insert-or-accumulate with
//!    linear, quadratic or double probing over power-of-two tables.
//!
//! 2. **Two-attempt SpGEMM** ([`spgemm`]): a first pass sized from an
//!    estimate counts every row, a second pass reruns the rows that did
//!    not fit, and a compaction pass writes the CSR output.
//!
//! 3. **Distributed coarsening** ([`coarsen`], [`comm`]): ranks own
//!    contiguous row blocks and keep ghost copies of off-rank measures and
//!    markers, refreshed by blocking exchanges.
//!
//! ## Usage
//!
//! Multiplying two matrices:
//!
//! ```
//! use amgcore::{spgemm, SparseMatrixCSR, SpgemmConfig};
//!
//! let a = SparseMatrixCSR::new(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1.0, 2.0, 3.0]);
//! let mut c = spgemm(&a, &a, &SpgemmConfig::default()).unwrap();
//! c.sort_indices();
//! assert_eq!(c.values, vec![1.0, 8.0, 9.0]);
//! ```
//!
//! Coarsening a 2D Laplacian on one rank:
//!
//! ```
//! use amgcore::gallery::{classical_strength, laplacian_5pt};
//! use amgcore::{pmis_coarsen, CoarsenConfig, ParCsrMatrix, PmisSelector, SerialComm};
//!
//! let a = laplacian_5pt(4, 4);
//! let s = classical_strength(&a, 0.25);
//! let s = ParCsrMatrix::from_global(&s, &[0, 16], 0).unwrap();
//!
//! let result = pmis_coarsen(&s, &SerialComm, &CoarsenConfig::default(), &PmisSelector, None).unwrap();
//! assert!(result.num_coarse > 0);
//! ```

pub mod coarsen;
pub mod comm;
pub mod constants;
pub mod context;
pub mod error;
pub mod gallery;
pub mod hash;
pub mod matrix;
pub mod spgemm;
pub mod utils;

// Re-export primary components
pub use coarsen::{pmis_coarsen, CfMarker, CoarsenResult, IndependentSetSelector, PmisSelector};
pub use comm::{exchange, exchange_reverse_add, CommPkg, Communicator, LocalComm, Message, SerialComm};
pub use context::{ExecutionPolicy, RuntimeConfig, RuntimeContext};
pub use error::{AmgError, CommError, Result};
pub use matrix::config::{CfInit, CoarsenConfig, HashType, OverflowPolicy, RowNnzEstimate, SpgemmConfig};
pub use matrix::{reference_spgemm, transpose, ParCsrMatrix, SparseMatrixCSR};
pub use spgemm::{galerkin_product, rap, spgemm, spgemm_with_stats, SpgemmStats};
pub use utils::{from_sprs_csr, to_sprs_csr};

/// Version information for the amgcore library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

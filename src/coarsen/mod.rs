//! Coarse/fine splitting of a distributed strength graph
//!
//! [`pmis_coarsen`] repeatedly picks an independent set of undecided rows
//! as coarse points and marks their undecided neighbors fine, until no
//! undecided row is left on any rank. Rows compete through their measure:
//! the number of rows they strongly influence plus a random tie breaker.

pub mod indep_set;
pub mod marker;
pub mod measure;
pub mod pmis;

pub use indep_set::{IndependentSetSelector, PmisSelector, StrengthView};
pub use marker::CfMarker;
pub use measure::global_measure;
pub use pmis::pmis_coarsen;

/// Outcome of a coarsening run on one rank
#[derive(Debug, Clone, PartialEq)]
pub struct CoarsenResult {
    /// Final marker of every local row
    pub cf_marker: Vec<CfMarker>,
    /// Iterations of the selection loop
    pub iterations: usize,
    /// Global number of undecided rows at the top of each iteration,
    /// ending with the 0 that stopped the loop
    pub graph_sizes: Vec<u64>,
    /// Local rows marked coarse
    pub num_coarse: usize,
}

impl CoarsenResult {
    /// Local rows marked coarse, in increasing order
    pub fn coarse_rows(&self) -> Vec<usize> {
        (0..self.cf_marker.len())
            .filter(|&i| self.cf_marker[i].is_coarse())
            .collect()
    }
}

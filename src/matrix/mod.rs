// Matrix data structures and operations

pub mod config;
pub mod csr;
pub mod distributed;
pub mod reference;
pub mod transpose;

pub use config::{CfInit, CoarsenConfig, HashType, OverflowPolicy, RowNnzEstimate, SpgemmConfig};
pub use csr::SparseMatrixCSR;
pub use distributed::ParCsrMatrix;
pub use reference::reference_spgemm;
pub use transpose::transpose;

//! Error types for amgcore.
//!
//! Configuration problems, structural problems with caller input, hash
//! table overflow on the authoritative SpGEMM attempt and communication
//! failures are all reported through [`AmgError`].

/// Primary error type for coarsening and SpGEMM operations.
#[derive(Debug, thiserror::Error)]
pub enum AmgError {
    /// The hash probing scheme identifier was not one of L, Q or D.
    #[error("unrecognized hash type '{0}', expected one of [L, Q, D]")]
    UnknownHashType(String),

    /// The coarsening initialization mode code is not part of [`crate::CfInit`].
    #[error("unrecognized CF initialization mode {0}, expected 0, 1, 3 or 4")]
    InvalidCfInit(i32),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operand shapes are incompatible.
    #[error("dimension mismatch in {context}: {left} vs {right}")]
    DimensionMismatch {
        /// Operation that detected the mismatch.
        context: &'static str,
        /// Size on the left-hand side.
        left: usize,
        /// Size on the right-hand side.
        right: usize,
    },

    /// CSR arrays are structurally inconsistent.
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// Rows still overflowed their hash tables on the second SpGEMM attempt.
    #[error("hash table overflow on {rows} row(s) during the second SpGEMM attempt (first: row {first_row})")]
    HashOverflow {
        /// Number of rows that overflowed.
        rows: usize,
        /// Lowest overflowing row index.
        first_row: usize,
    },

    /// The coarsening loop exceeded its iteration bound.
    #[error("coarsening made no progress after {iterations} iterations")]
    NoProgress {
        /// Iterations completed.
        iterations: usize,
    },

    /// A rank-to-rank exchange failed.
    #[error("communication failure: {0}")]
    Comm(#[from] CommError),
}

/// Errors raised by the communication layer.
#[derive(Debug, thiserror::Error)]
pub enum CommError {
    /// The peer rank hung up.
    #[error("rank {peer} disconnected")]
    Disconnected {
        /// Peer rank.
        peer: usize,
    },

    /// Messages arrived out of the expected exchange order.
    #[error("expected tag {expected} from rank {peer}, received tag {received}")]
    TagMismatch {
        /// Peer rank.
        peer: usize,
        /// Tag the receiver was waiting for.
        expected: u32,
        /// Tag actually received.
        received: u32,
    },

    /// A message carried the wrong payload type or length.
    #[error("payload mismatch from rank {peer}: {detail}")]
    PayloadMismatch {
        /// Peer rank.
        peer: usize,
        /// Human-readable explanation.
        detail: String,
    },

    /// A rank index outside the communicator was addressed.
    #[error("rank {rank} out of range for communicator of size {size}")]
    InvalidRank {
        /// Addressed rank.
        rank: usize,
        /// Communicator size.
        size: usize,
    },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, AmgError>;

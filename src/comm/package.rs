//! Communication package of a row-partitioned matrix
//!
//! For every neighbor rank the package records which local rows are sent
//! there and which slice of the off-diagonal ghost buffer is filled from
//! there. Ghost columns are sorted by global index, so the columns owned by
//! one neighbor form a contiguous slice.

use log::debug;

use super::{Communicator, Message};
use crate::constants::TAG_COMM_PKG;
use crate::error::{AmgError, CommError, Result};

/// Local rows whose values are sent to one neighbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborSend {
    /// Destination rank
    pub rank: usize,
    /// Local row indices, in the order the neighbor expects them
    pub elements: Vec<usize>,
}

/// Slice of the ghost buffer received from one neighbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecv {
    /// Source rank
    pub rank: usize,
    /// First ghost index filled from this neighbor
    pub start: usize,
    /// Number of ghost values from this neighbor
    pub len: usize,
}

/// Who sends what to whom for one ghost exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommPkg {
    sends: Vec<NeighborSend>,
    recvs: Vec<NeighborRecv>,
    num_ghosts: usize,
}

/// Rank owning global row `global` in the partition `row_starts`
pub fn owner_of(row_starts: &[usize], global: usize) -> usize {
    row_starts.partition_point(|&start| start <= global) - 1
}

impl CommPkg {
    /// Assembles a package from explicit neighbor lists
    ///
    /// Receives must be sorted by `start` and tile `0..num_ghosts`.
    pub fn new(sends: Vec<NeighborSend>, recvs: Vec<NeighborRecv>) -> Result<Self> {
        let mut expected_start = 0;
        for recv in &recvs {
            if recv.start != expected_start {
                return Err(AmgError::InvalidConfig(format!(
                    "receive from rank {} starts at {}, expected {}",
                    recv.rank, recv.start, expected_start
                )));
            }
            expected_start += recv.len;
        }

        Ok(Self {
            sends,
            recvs,
            num_ghosts: expected_start,
        })
    }

    /// Builds the package from the off-diagonal column map
    ///
    /// Every rank tells every other rank which of its rows it needs (an
    /// empty request included), so all ranks must call this collectively.
    pub fn build<C: Communicator>(comm: &C, row_starts: &[usize], col_map_offd: &[usize]) -> Result<Self> {
        let me = comm.rank();
        let size = comm.size();
        if row_starts.len() != size + 1 {
            return Err(AmgError::DimensionMismatch {
                context: "CommPkg::build row_starts",
                left: row_starts.len(),
                right: size + 1,
            });
        }

        if col_map_offd.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AmgError::InvalidMatrix(
                "off-diagonal column map must be strictly increasing".to_string(),
            ));
        }

        let mut requests: Vec<Vec<usize>> = vec![Vec::new(); size];
        for &global in col_map_offd {
            if global >= row_starts[size] {
                return Err(AmgError::InvalidMatrix(format!(
                    "off-diagonal column {} beyond global size {}",
                    global, row_starts[size]
                )));
            }
            let owner = owner_of(row_starts, global);
            if owner == me {
                return Err(AmgError::InvalidMatrix(format!(
                    "off-diagonal column {} is owned by this rank",
                    global
                )));
            }
            requests[owner].push(global);
        }

        let mut recvs = Vec::new();
        let mut start = 0;
        for (rank, needed) in requests.iter().enumerate() {
            if !needed.is_empty() {
                recvs.push(NeighborRecv {
                    rank,
                    start,
                    len: needed.len(),
                });
                start += needed.len();
            }
        }

        for (peer, needed) in requests.into_iter().enumerate() {
            if peer != me {
                comm.send(peer, TAG_COMM_PKG, Message::Indices(needed))?;
            }
        }

        let (first, last) = (row_starts[me], row_starts[me + 1]);
        let mut sends = Vec::new();
        for peer in (0..size).filter(|&p| p != me) {
            let wanted = match comm.recv(peer, TAG_COMM_PKG)? {
                Message::Indices(wanted) => wanted,
                other => {
                    return Err(CommError::PayloadMismatch {
                        peer,
                        detail: format!("expected indices, got {}", other.kind()),
                    }
                    .into())
                }
            };
            if wanted.is_empty() {
                continue;
            }
            if let Some(&bad) = wanted.iter().find(|&&g| g < first || g >= last) {
                return Err(CommError::PayloadMismatch {
                    peer,
                    detail: format!("requested row {} outside {}..{}", bad, first, last),
                }
                .into());
            }
            sends.push(NeighborSend {
                rank: peer,
                elements: wanted.into_iter().map(|g| g - first).collect(),
            });
        }

        let pkg = Self::new(sends, recvs)?;
        debug!(
            "rank {}: comm package with {} sends ({} elements) and {} receives ({} ghosts)",
            me,
            pkg.sends.len(),
            pkg.num_send_elements(),
            pkg.recvs.len(),
            pkg.num_ghosts
        );
        Ok(pkg)
    }

    /// Neighbors this rank sends to
    pub fn sends(&self) -> &[NeighborSend] {
        &self.sends
    }

    /// Neighbors this rank receives from
    pub fn recvs(&self) -> &[NeighborRecv] {
        &self.recvs
    }

    /// Number of ghost values received per exchange
    pub fn num_ghosts(&self) -> usize {
        self.num_ghosts
    }

    /// Number of values sent per exchange
    pub fn num_send_elements(&self) -> usize {
        self.sends.iter().map(|s| s.elements.len()).sum()
    }
}

//! Rank-to-rank communication
//!
//! The coarsening driver runs on every rank of a row-partitioned matrix
//! and keeps ghost copies of the measures and CF markers of off-diagonal
//! columns. This module provides the [`Communicator`] abstraction, a
//! single-rank [`SerialComm`], the thread-backed [`LocalComm`], the
//! communication package describing who sends what to whom, and the
//! blocking ghost exchanges built on top of it.

pub mod exchange;
pub mod local;
pub mod package;

use crate::constants::TAG_ALL_REDUCE;
use crate::error::CommError;

pub use exchange::{exchange, exchange_reverse_add, Exchangeable};
pub use local::LocalComm;
pub use package::{CommPkg, NeighborRecv, NeighborSend};

/// Payload of one point-to-point message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Integer data (CF markers)
    Ints(Vec<i32>),
    /// Real data (measures)
    Reals(Vec<f64>),
    /// Index lists (communication package construction)
    Indices(Vec<usize>),
    /// A single count (reductions)
    Count(u64),
}

impl Message {
    /// Short name of the payload kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Ints(_) => "ints",
            Message::Reals(_) => "reals",
            Message::Indices(_) => "indices",
            Message::Count(_) => "count",
        }
    }
}

/// Blocking point-to-point communication between ranks
///
/// Messages between one pair of ranks are delivered in order. Every
/// exchange posts all of its sends before waiting on its receives, so
/// implementations must buffer sends.
pub trait Communicator: Sync {
    /// Index of this rank
    fn rank(&self) -> usize;

    /// Number of ranks
    fn size(&self) -> usize;

    /// Queues `message` for rank `dest`
    fn send(&self, dest: usize, tag: u32, message: Message) -> Result<(), CommError>;

    /// Waits for the next message from rank `src`, which must carry `tag`
    fn recv(&self, src: usize, tag: u32) -> Result<Message, CommError>;

    /// Sums `value` over all ranks
    fn all_reduce_sum(&self, value: u64) -> Result<u64, CommError> {
        let me = self.rank();
        for peer in (0..self.size()).filter(|&p| p != me) {
            self.send(peer, TAG_ALL_REDUCE, Message::Count(value))?;
        }

        let mut total = value;
        for peer in (0..self.size()).filter(|&p| p != me) {
            match self.recv(peer, TAG_ALL_REDUCE)? {
                Message::Count(v) => total += v,
                other => {
                    return Err(CommError::PayloadMismatch {
                        peer,
                        detail: format!("expected count, got {}", other.kind()),
                    })
                }
            }
        }
        Ok(total)
    }
}

/// Communicator of a single rank; it has no peers
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, dest: usize, _tag: u32, _message: Message) -> Result<(), CommError> {
        Err(CommError::InvalidRank { rank: dest, size: 1 })
    }

    fn recv(&self, src: usize, _tag: u32) -> Result<Message, CommError> {
        Err(CommError::InvalidRank { rank: src, size: 1 })
    }
}

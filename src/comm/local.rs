//! In-process communicator: one thread per rank

use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{Communicator, Message};
use crate::error::CommError;

struct Envelope {
    tag: u32,
    message: Message,
}

/// A rank of a fully connected in-process mesh
///
/// Each ordered pair of ranks has its own unbounded channel, so sends
/// never block and messages from one peer arrive in order.
pub struct LocalComm {
    rank: usize,
    size: usize,
    senders: Vec<Option<Sender<Envelope>>>,
    receivers: Vec<Option<Receiver<Envelope>>>,
}

impl LocalComm {
    /// Creates the communicators of a `size`-rank mesh, in rank order
    pub fn mesh(size: usize) -> Vec<LocalComm> {
        let mut comms: Vec<LocalComm> = (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                senders: (0..size).map(|_| None).collect(),
                receivers: (0..size).map(|_| None).collect(),
            })
            .collect();

        for src in 0..size {
            for dst in (0..size).filter(|&d| d != src) {
                let (tx, rx) = unbounded();
                comms[src].senders[dst] = Some(tx);
                comms[dst].receivers[src] = Some(rx);
            }
        }

        comms
    }

    /// Runs `f` on `size` ranks, each on its own thread, and returns the
    /// results in rank order
    ///
    /// A panic on any rank is propagated to the caller.
    pub fn spawn<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(LocalComm) -> R + Sync,
        R: Send,
    {
        let f = &f;
        thread::scope(|scope| {
            let handles: Vec<_> = Self::mesh(size)
                .into_iter()
                .map(|comm| scope.spawn(move || f(comm)))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
    }

    fn check_peer(&self, peer: usize) -> Result<(), CommError> {
        if peer >= self.size || peer == self.rank {
            return Err(CommError::InvalidRank {
                rank: peer,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: u32, message: Message) -> Result<(), CommError> {
        self.check_peer(dest)?;
        let sender = self.senders[dest].as_ref().ok_or(CommError::Disconnected { peer: dest })?;
        sender
            .send(Envelope { tag, message })
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn recv(&self, src: usize, tag: u32) -> Result<Message, CommError> {
        self.check_peer(src)?;
        let receiver = self.receivers[src].as_ref().ok_or(CommError::Disconnected { peer: src })?;
        let envelope = receiver.recv().map_err(|_| CommError::Disconnected { peer: src })?;

        if envelope.tag != tag {
            return Err(CommError::TagMismatch {
                peer: src,
                expected: tag,
                received: envelope.tag,
            });
        }
        Ok(envelope.message)
    }
}

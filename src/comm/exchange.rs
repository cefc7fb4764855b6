//! Blocking ghost exchanges over a [`CommPkg`]

use super::{CommPkg, Communicator, Message};
use crate::constants::{TAG_INT, TAG_REAL, TAG_REAL_REVERSE};
use crate::error::{CommError, Result};

/// Values that can travel in a ghost exchange
pub trait Exchangeable: Copy + Send + Sync + 'static {
    /// Message tag of a forward exchange of this type
    const TAG: u32;

    /// Packs a send buffer into a message
    fn pack(values: Vec<Self>) -> Message;

    /// Unpacks a message; `None` if it carries another payload kind
    fn unpack(message: Message) -> Option<Vec<Self>>;
}

impl Exchangeable for f64 {
    const TAG: u32 = TAG_REAL;

    fn pack(values: Vec<Self>) -> Message {
        Message::Reals(values)
    }

    fn unpack(message: Message) -> Option<Vec<Self>> {
        match message {
            Message::Reals(values) => Some(values),
            _ => None,
        }
    }
}

impl Exchangeable for i32 {
    const TAG: u32 = TAG_INT;

    fn pack(values: Vec<Self>) -> Message {
        Message::Ints(values)
    }

    fn unpack(message: Message) -> Option<Vec<Self>> {
        match message {
            Message::Ints(values) => Some(values),
            _ => None,
        }
    }
}

fn unpack_exact<V: Exchangeable>(peer: usize, message: Message, len: usize) -> Result<Vec<V>> {
    let kind = message.kind();
    let values = V::unpack(message).ok_or_else(|| CommError::PayloadMismatch {
        peer,
        detail: format!("unexpected {} payload", kind),
    })?;
    if values.len() != len {
        return Err(CommError::PayloadMismatch {
            peer,
            detail: format!("expected {} values, got {}", len, values.len()),
        }
        .into());
    }
    Ok(values)
}

/// Gathers the ghost copies of `local` described by `pkg`
///
/// Each rank sends the values of its send elements to each neighbor and
/// returns the values it receives, laid out in off-diagonal column order.
pub fn exchange<C, V>(comm: &C, pkg: &CommPkg, local: &[V]) -> Result<Vec<V>>
where
    C: Communicator,
    V: Exchangeable,
{
    for send in pkg.sends() {
        let buffer: Vec<V> = send.elements.iter().map(|&e| local[e]).collect();
        comm.send(send.rank, V::TAG, V::pack(buffer))?;
    }

    let mut ghosts = Vec::with_capacity(pkg.num_ghosts());
    for recv in pkg.recvs() {
        let message = comm.recv(recv.rank, V::TAG)?;
        ghosts.extend(unpack_exact::<V>(recv.rank, message, recv.len)?);
    }
    debug_assert_eq!(ghosts.len(), pkg.num_ghosts());

    Ok(ghosts)
}

/// Sends ghost contributions back to their owners, which add them into
/// `local`
pub fn exchange_reverse_add<C: Communicator>(
    comm: &C,
    pkg: &CommPkg,
    ghosts: &[f64],
    local: &mut [f64],
) -> Result<()> {
    debug_assert_eq!(ghosts.len(), pkg.num_ghosts());
    for recv in pkg.recvs() {
        let slice = ghosts[recv.start..recv.start + recv.len].to_vec();
        comm.send(recv.rank, TAG_REAL_REVERSE, Message::Reals(slice))?;
    }

    for send in pkg.sends() {
        let message = comm.recv(send.rank, TAG_REAL_REVERSE)?;
        let values = unpack_exact::<f64>(send.rank, message, send.elements.len())?;
        for (&element, value) in send.elements.iter().zip(values) {
            local[element] += value;
        }
    }

    Ok(())
}

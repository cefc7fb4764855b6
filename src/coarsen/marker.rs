//! Coarse/fine point markers

use crate::comm::{Exchangeable, Message};
use crate::constants::TAG_CF_MARKER;

/// Classification of a row during coarsening
///
/// The integer codes are the ones used on the wire and by callers that
/// supply preset markers: positive codes are coarse, negative codes fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CfMarker {
    #[default]
    Undecided,
    Coarse,
    Fine,
    CommonCoarse,
    Isolated,
    StrongFine,
}

impl CfMarker {
    /// Integer code of this marker
    pub fn code(self) -> i32 {
        match self {
            CfMarker::Undecided => 0,
            CfMarker::Coarse => 1,
            CfMarker::Fine => -1,
            CfMarker::CommonCoarse => 2,
            CfMarker::Isolated => -2,
            CfMarker::StrongFine => -3,
        }
    }

    /// Marker for an integer code, `None` for unknown codes
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(CfMarker::Undecided),
            1 => Some(CfMarker::Coarse),
            -1 => Some(CfMarker::Fine),
            2 => Some(CfMarker::CommonCoarse),
            -2 => Some(CfMarker::Isolated),
            -3 => Some(CfMarker::StrongFine),
            _ => None,
        }
    }

    #[inline]
    pub fn is_coarse(self) -> bool {
        self.code() > 0
    }

    #[inline]
    pub fn is_fine(self) -> bool {
        self.code() < 0
    }

    #[inline]
    pub fn is_undecided(self) -> bool {
        self == CfMarker::Undecided
    }
}

impl Exchangeable for CfMarker {
    const TAG: u32 = TAG_CF_MARKER;

    fn pack(values: Vec<Self>) -> Message {
        Message::Ints(values.into_iter().map(CfMarker::code).collect())
    }

    fn unpack(message: Message) -> Option<Vec<Self>> {
        match message {
            Message::Ints(codes) => codes.into_iter().map(CfMarker::from_code).collect(),
            _ => None,
        }
    }
}

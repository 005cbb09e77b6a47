//! Runtime value tags and their type ids.
//!
//! The execution runtime passes values around as tagged 64-bit words. This
//! module is the fixed contract between that encoding and the [`TypeId`]
//! numbering, so an `isinstance`-style check resolves through the same ids
//! the lattice answers for.
//!
//! # Layout
//!
//! ```text
//! ...xxx00  heap pointer (8-byte aligned); type from the object's header tag
//! ...xxx01  small int, value in bits 3..64 (61-bit signed)
//! cccccc11  special value, code in bits 2..8
//! ...xxx10  invalid
//! ```
//!
//! Special codes: `0` none, `1` true, `2` false.
//!
//! Any change to this layout or to the builtin ids bumps
//! [`CONTRACT_VERSION`].

use crate::{CoreError, TypeId};

/// Version of the tag layout and builtin numbering. The runtime checks this
/// at startup.
pub const CONTRACT_VERSION: u32 = 1;

const TAG_MASK: u64 = 0b11;
const PTR_ALIGN_MASK: u64 = 0b111;
const PTR_TAG: u64 = 0b00;
const INT_TAG: u64 = 0b01;
const SPECIAL_TAG: u64 = 0b11;

const INT_SHIFT: u32 = 3;
const SPECIAL_SHIFT: u32 = 2;
const SPECIAL_MASK: u64 = 0b11_1111;

const SPECIAL_NONE: u64 = 0;
const SPECIAL_TRUE: u64 = 1;
const SPECIAL_FALSE: u64 = 2;

/// Smallest and one past the largest small-int payload.
const SMALL_INT_MIN: i64 = -(1 << 60);
const SMALL_INT_END: i64 = 1 << 60;

/// Decoded shape of a tagged word.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueTag {
    /// Pointer to a heap object carrying its own type tag.
    Heap,
    /// Inline integer.
    SmallInt(i64),
    /// The `None` singleton.
    None,
    /// `True` or `False`.
    Bool(bool),
}

impl ValueTag {
    /// Classify a tagged word.
    pub fn decode(word: u64) -> Result<Self, CoreError> {
        match word & TAG_MASK {
            PTR_TAG if word == 0 => Err(CoreError::InvalidArgument("null heap pointer")),
            PTR_TAG if word & PTR_ALIGN_MASK != 0 => {
                Err(CoreError::InvalidArgument("misaligned heap pointer"))
            }
            PTR_TAG => Ok(Self::Heap),
            INT_TAG => Ok(Self::SmallInt(small_int_payload(word))),
            SPECIAL_TAG => match (word >> SPECIAL_SHIFT) & SPECIAL_MASK {
                SPECIAL_NONE => Ok(Self::None),
                SPECIAL_TRUE => Ok(Self::Bool(true)),
                SPECIAL_FALSE => Ok(Self::Bool(false)),
                _ => Err(CoreError::InvalidArgument("unknown special value code")),
            },
            _ => Err(CoreError::InvalidArgument("invalid value tag")),
        }
    }

    /// Encode an inline integer, or `None` if it needs a heap box.
    pub fn encode_int(value: i64) -> Option<u64> {
        if !(SMALL_INT_MIN..SMALL_INT_END).contains(&value) {
            return None;
        }
        #[expect(clippy::cast_sign_loss, reason = "bit pattern is kept as-is")]
        let bits = (value << INT_SHIFT) as u64;
        Some(bits | INT_TAG)
    }

    pub const fn encode_bool(value: bool) -> u64 {
        let code = if value { SPECIAL_TRUE } else { SPECIAL_FALSE };
        (code << SPECIAL_SHIFT) | SPECIAL_TAG
    }

    pub const fn encode_none() -> u64 {
        (SPECIAL_NONE << SPECIAL_SHIFT) | SPECIAL_TAG
    }

    /// Type id of an immediate value; `None` for heap values, whose type
    /// lives in the object header.
    pub const fn immediate_type(self) -> Option<TypeId> {
        match self {
            Self::Heap => None,
            Self::SmallInt(_) => Some(TypeId::INT),
            Self::None => Some(TypeId::NONE),
            Self::Bool(_) => Some(TypeId::BOOL),
        }
    }
}

fn small_int_payload(word: u64) -> i64 {
    #[expect(
        clippy::cast_possible_wrap,
        reason = "reinterpret as signed before the arithmetic shift"
    )]
    let signed = word as i64;
    signed >> INT_SHIFT
}

/// Type id of a tagged runtime word.
///
/// `heap_type` is the header tag of the pointed-to object and is consulted
/// only for heap values.
pub fn value_type_id(word: u64, heap_type: TypeId) -> Result<TypeId, CoreError> {
    match ValueTag::decode(word)?.immediate_type() {
        Some(id) => Ok(id),
        None => {
            heap_type.index()?;
            Ok(heap_type)
        }
    }
}

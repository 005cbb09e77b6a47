//! Type identifiers.
//!
//! A [`TypeId`] is a plain 64-bit number naming one type. The universe is
//! bounded at [`UNIVERSE`] ids so that a set of types fits a fixed bit array
//! and a lattice traversal fits a fixed visited set.
//!
//! # Reserved numbering
//!
//! The low ids are shared with the runtime's tagged-value encoding (see
//! [`crate::value_tag`]) and must never be renumbered:
//!
//! - `0` `never` (bottom), `1` `any` (top)
//! - `2..=7` builtin value types
//! - `8..64` reserved for future builtins
//! - `64..` dynamically assigned user types

use std::fmt;

use crate::CoreError;

/// Number of nameable types. Fixes the bit-set word count and the lattice
/// visited-array size.
pub const UNIVERSE: usize = 4096;

/// A 64-bit type identifier.
///
/// Construction is unchecked; every operation that consumes a `TypeId`
/// validates it against [`UNIVERSE`] and reports [`CoreError::InvalidTypeId`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u64);

impl TypeId {
    // === Lattice sentinels ===

    /// Bottom type: subtype of everything, no values.
    pub const NEVER: Self = Self(0);
    /// Top type: supertype of everything.
    pub const ANY: Self = Self(1);

    // === Builtin value types (2-7) ===

    /// `None` singleton (runtime special code 0).
    pub const NONE: Self = Self(2);
    /// `bool` (runtime special codes 1 and 2).
    pub const BOOL: Self = Self(3);
    /// `int` (runtime small-int tag).
    pub const INT: Self = Self(4);
    /// `float`.
    pub const FLOAT: Self = Self(5);
    /// `str`.
    pub const STR: Self = Self(6);
    /// Generic heap object.
    pub const OBJECT: Self = Self(7);

    /// Number of builtin ids with a fixed meaning.
    pub const BUILTIN_COUNT: u64 = 8;

    /// First id available for user types. `8..64` is reserved.
    pub const FIRST_DYNAMIC: u64 = 64;

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this id lies inside the universe.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 < UNIVERSE as u64
    }

    /// Validate and return the bit index of this id.
    #[inline]
    pub fn index(self) -> Result<usize, CoreError> {
        match usize::try_from(self.0) {
            Ok(index) if index < UNIVERSE => Ok(index),
            _ => Err(CoreError::InvalidTypeId { raw: self.0 }),
        }
    }

    /// Bit index of an id already validated against the universe.
    #[inline]
    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }

    /// Build an id from a bit index known to be below [`UNIVERSE`].
    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u64)
    }

    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::BUILTIN_COUNT
    }

    /// Human-readable name of a builtin id, `None` for everything else.
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("never"),
            1 => Some("any"),
            2 => Some("none"),
            3 => Some("bool"),
            4 => Some("int"),
            5 => Some("float"),
            6 => Some("str"),
            7 => Some("object"),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "TypeId::{}", name.to_ascii_uppercase()),
            None => write!(f, "TypeId({})", self.0),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "type#{}", self.0),
        }
    }
}

impl From<u64> for TypeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

const _: () = assert!(std::mem::size_of::<TypeId>() == 8);

#[cfg(test)]
mod tests;

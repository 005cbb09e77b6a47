//! Error taxonomy shared by the set, the lattice and the ABI bridge.
//!
//! Every variant is a local, synchronous logic error reported to the
//! immediate caller. Nothing here is transient, so nothing is retried.

use crate::TypeId;

/// Error returned by fallible core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A type id at or above the universe bound.
    #[error("type id {raw} is outside the universe of 4096 types")]
    InvalidTypeId { raw: u64 },

    /// A null, freed or foreign handle crossed the ABI.
    #[error("invalid or stale type-set handle")]
    InvalidHandle,

    /// An output buffer was too small. Retry with at least `needed` slots.
    #[error("output buffer holds {capacity} ids but {needed} are required")]
    CapacityExceeded { capacity: usize, needed: usize },

    /// A malformed argument, such as an intersection over zero sets.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A query reached a lattice still in its build phase.
    #[error("subtype lattice has not been frozen")]
    LatticeNotFrozen,

    /// A mutation reached a lattice after it was frozen.
    #[error("subtype lattice is already frozen")]
    LatticeAlreadyFrozen,

    /// Adding `child <: supertype` would close a cycle.
    #[error("edge {child} <: {supertype} would create a subtype cycle")]
    CycleDetected { child: TypeId, supertype: TypeId },
}

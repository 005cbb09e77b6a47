//! Type-set and subtype-lattice core for Tyl.
//!
//! Three pieces share one [`TypeId`] numbering:
//!
//! - [`TypeBitSet`]: a fixed 4096-bit membership set with chunked set algebra
//!   (see [`kernel`] for the chunk widths).
//! - [`SubtypeLattice`]: a build-then-freeze DAG of immediate subtype edges
//!   answering `is_subtype`, `meet` and `join`.
//! - [`value_tag`]: the mapping from the runtime's tagged value words to
//!   type ids.
//!
//! Everything here is synchronous and lock-free. A frozen lattice and any
//! set can be shared across threads by reference; mutation needs `&mut`.
//! The C-callable surface lives in the `tyl_abi` crate.

mod bitset;
mod error;
pub mod id;
pub mod kernel;
pub mod lattice;
pub mod value_tag;

pub use bitset::{Iter as TypeSetIter, TypeBitSet};
pub use error::CoreError;
pub use id::{TypeId, UNIVERSE};
pub use kernel::{ChunkWidth, SetOp};
pub use lattice::{MeetJoinPolicy, Phase, SubtypeLattice};
pub use value_tag::{value_type_id, ValueTag, CONTRACT_VERSION};

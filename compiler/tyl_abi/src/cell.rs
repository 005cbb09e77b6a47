//! Process-wide home of the subtype lattice.
//!
//! Build calls go through a mutex around the lattice under construction.
//! `freeze` moves the finished lattice into a [`OnceLock`], after which
//! queries read it with no locking at all.

use std::sync::OnceLock;

use parking_lot::{const_mutex, Mutex};
use tyl_types::{CoreError, MeetJoinPolicy, Phase, SubtypeLattice, TypeId};

/// A lattice that is built under a lock and queried lock-free once frozen.
pub struct LatticeCell {
    building: Mutex<Option<SubtypeLattice>>,
    frozen: OnceLock<SubtypeLattice>,
}

impl LatticeCell {
    pub const fn new() -> Self {
        Self {
            building: const_mutex(None),
            frozen: OnceLock::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.frozen.get().is_some() {
            Phase::Frozen
        } else {
            Phase::Building
        }
    }

    /// Run `f` against the lattice under construction.
    ///
    /// The frozen check happens under the build lock so a mutation racing
    /// `freeze` cannot land in a lattice that will never be read.
    fn build<R>(
        &self,
        f: impl FnOnce(&mut SubtypeLattice) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let mut building = self.building.lock();
        if self.frozen.get().is_some() {
            return Err(CoreError::LatticeAlreadyFrozen);
        }
        f(building.get_or_insert_with(SubtypeLattice::new))
    }

    pub fn add_edge(&self, child: TypeId, supertype: TypeId) -> Result<bool, CoreError> {
        self.build(|lattice| lattice.add_edge(child, supertype))
    }

    pub fn set_policy(&self, policy: MeetJoinPolicy) -> Result<(), CoreError> {
        self.build(|lattice| lattice.set_policy(policy))
    }

    /// Freeze the lattice and publish it for lock-free queries.
    ///
    /// On failure the lattice stays in its build phase, unchanged.
    pub fn freeze(&self) -> Result<(), CoreError> {
        let mut building = self.building.lock();
        if self.frozen.get().is_some() {
            return Err(CoreError::LatticeAlreadyFrozen);
        }
        let lattice = building.get_or_insert_with(SubtypeLattice::new);
        lattice.freeze()?;
        let lattice = std::mem::take(lattice);
        *building = None;
        self.frozen
            .set(lattice)
            .map_err(|_| CoreError::LatticeAlreadyFrozen)
    }

    /// The frozen lattice, after validating the ids a query is about to use.
    fn frozen(&self, ids: [TypeId; 2]) -> Result<&SubtypeLattice, CoreError> {
        for id in ids {
            id.index()?;
        }
        self.frozen.get().ok_or(CoreError::LatticeNotFrozen)
    }

    pub fn is_subtype(&self, a: TypeId, b: TypeId) -> Result<bool, CoreError> {
        self.frozen([a, b])?.is_subtype(a, b)
    }

    pub fn meet(&self, a: TypeId, b: TypeId) -> Result<TypeId, CoreError> {
        self.frozen([a, b])?.meet(a, b)
    }

    pub fn join(&self, a: TypeId, b: TypeId) -> Result<TypeId, CoreError> {
        self.frozen([a, b])?.join(a, b)
    }
}

impl Default for LatticeCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the ABI's numeric policy code.
pub fn policy_from_code(code: u32) -> Result<MeetJoinPolicy, CoreError> {
    match code {
        0 => Ok(MeetJoinPolicy::Direct),
        1 => Ok(MeetJoinPolicy::CommonBound),
        _ => Err(CoreError::InvalidArgument("unknown meet/join policy")),
    }
}

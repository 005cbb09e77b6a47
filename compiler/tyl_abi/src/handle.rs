//! Generation-checked storage for sets handed across the ABI.
//!
//! A raw handle packs a slot index and the slot's generation:
//!
//! ```text
//! bits 63..32  generation
//! bits 31..0   slot + 1   (0 is the null handle)
//! ```
//!
//! Freeing a set bumps its slot's generation before the slot is reused, so
//! a stale copy of the old handle no longer matches and is rejected with
//! [`CoreError::InvalidHandle`] instead of reaching the new occupant. A slot
//! whose generation is exhausted is retired rather than wrapped back to 0.

use tyl_types::{CoreError, TypeBitSet};

/// The null handle. Never issued.
pub const NULL_HANDLE: u64 = 0;

#[derive(Debug)]
struct Slot {
    generation: u32,
    set: Option<Box<TypeBitSet>>,
}

/// Owner of every set reachable through a handle.
#[derive(Debug, Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    /// Vacant slot indices, reused most recent first.
    vacant: Vec<u32>,
    live: usize,
}

fn encode(index: u32, generation: u32) -> u64 {
    (u64::from(generation) << 32) | (u64::from(index) + 1)
}

fn decode(handle: u64) -> Result<(u32, u32), CoreError> {
    #[expect(clippy::cast_possible_truncation, reason = "low half holds the slot")]
    let low = handle as u32;
    let index = low.checked_sub(1).ok_or(CoreError::InvalidHandle)?;
    #[expect(clippy::cast_possible_truncation, reason = "high half holds the generation")]
    let generation = (handle >> 32) as u32;
    Ok((index, generation))
}

impl HandleTable {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    /// Number of sets not yet freed.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Take ownership of `set` and return its handle.
    pub fn insert(&mut self, set: TypeBitSet) -> Result<u64, CoreError> {
        let index = match self.vacant.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| {
                    CoreError::CapacityExceeded {
                        capacity: self.slots.len(),
                        needed: self.slots.len() + 1,
                    }
                })?;
                self.slots.push(Slot {
                    generation: 0,
                    set: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.set = Some(Box::new(set));
        self.live += 1;
        Ok(encode(index, slot.generation))
    }

    fn slot(&self, handle: u64) -> Result<&Slot, CoreError> {
        let (index, generation) = decode(handle)?;
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .ok_or(CoreError::InvalidHandle)
    }

    pub fn get(&self, handle: u64) -> Result<&TypeBitSet, CoreError> {
        self.slot(handle)?
            .set
            .as_deref()
            .ok_or(CoreError::InvalidHandle)
    }

    pub fn get_mut(&mut self, handle: u64) -> Result<&mut TypeBitSet, CoreError> {
        let (index, generation) = decode(handle)?;
        self.slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.set.as_deref_mut())
            .ok_or(CoreError::InvalidHandle)
    }

    /// Release the set behind `handle`. The handle is dead afterwards.
    pub fn remove(&mut self, handle: u64) -> Result<TypeBitSet, CoreError> {
        let (index, generation) = decode(handle)?;
        let slot = self
            .slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == generation)
            .ok_or(CoreError::InvalidHandle)?;
        let set = slot.set.take().ok_or(CoreError::InvalidHandle)?;
        self.live -= 1;
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.vacant.push(index);
            }
            None => tracing::debug!(slot = index, "retiring slot with exhausted generation"),
        }
        Ok(*set)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod tests;

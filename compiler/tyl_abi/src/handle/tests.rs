use tyl_types::TypeId;

use super::*;

fn set_of(raw: &[u64]) -> TypeBitSet {
    let ids: Vec<TypeId> = raw.iter().copied().map(TypeId::from_raw).collect();
    TypeBitSet::from_ids(&ids).unwrap()
}

#[test]
fn insert_then_get() {
    let mut table = HandleTable::new();
    let h = table.insert(set_of(&[3, 7, 9])).unwrap();
    assert_ne!(h, NULL_HANDLE);
    assert_eq!(table.get(h).unwrap(), &set_of(&[3, 7, 9]));
    assert_eq!(table.live(), 1);
}

#[test]
fn handles_are_distinct() {
    let mut table = HandleTable::new();
    let a = table.insert(TypeBitSet::new()).unwrap();
    let b = table.insert(TypeBitSet::new()).unwrap();
    assert_ne!(a, b);
    assert_eq!(table.live(), 2);
}

#[test]
fn get_mut_changes_the_stored_set() {
    let mut table = HandleTable::new();
    let h = table.insert(TypeBitSet::new()).unwrap();
    table.get_mut(h).unwrap().insert(TypeId::INT).unwrap();
    assert_eq!(table.get(h).unwrap().contains(TypeId::INT), Ok(true));
}

#[test]
fn remove_returns_the_set_and_kills_the_handle() {
    let mut table = HandleTable::new();
    let h = table.insert(set_of(&[5])).unwrap();
    assert_eq!(table.remove(h), Ok(set_of(&[5])));
    assert_eq!(table.live(), 0);

    assert_eq!(table.get(h), Err(CoreError::InvalidHandle));
    assert_eq!(table.get_mut(h).err(), Some(CoreError::InvalidHandle));
    assert_eq!(table.remove(h), Err(CoreError::InvalidHandle));
}

#[test]
fn stale_handle_does_not_reach_reused_slot() {
    let mut table = HandleTable::new();
    let old = table.insert(set_of(&[1])).unwrap();
    table.remove(old).unwrap();

    let new = table.insert(set_of(&[2])).unwrap();
    // Same slot, next generation.
    assert_eq!(old & 0xffff_ffff, new & 0xffff_ffff);
    assert_ne!(old, new);
    assert_eq!(table.get(old), Err(CoreError::InvalidHandle));
    assert_eq!(table.get(new).unwrap(), &set_of(&[2]));
}

#[test]
fn null_and_foreign_handles_are_rejected() {
    let mut table = HandleTable::new();
    table.insert(TypeBitSet::new()).unwrap();

    assert_eq!(table.get(NULL_HANDLE), Err(CoreError::InvalidHandle));
    // Generation 0 sits in the high half, so a high-only value has no slot.
    assert_eq!(table.get(1 << 32), Err(CoreError::InvalidHandle));
    // Slot that was never allocated.
    assert_eq!(table.get(999), Err(CoreError::InvalidHandle));
    // Right slot, wrong generation.
    assert_eq!(table.get((7 << 32) | 1), Err(CoreError::InvalidHandle));
}

#[test]
fn handle_layout_packs_generation_and_slot() {
    assert_eq!(encode(0, 0), 1);
    assert_eq!(encode(4, 2), (2 << 32) | 5);
    assert_eq!(decode((2 << 32) | 5), Ok((4, 2)));
    assert_eq!(decode(NULL_HANDLE), Err(CoreError::InvalidHandle));
}

#[test]
fn exhausted_generation_retires_the_slot() {
    let mut table = HandleTable::new();
    let first = table.insert(set_of(&[1])).unwrap();
    table.remove(first).unwrap();

    // Fast-forward slot 0 to its last generation.
    table.slots[0].generation = u32::MAX;
    let last = table.insert(set_of(&[2])).unwrap();
    assert_eq!(last, encode(0, u32::MAX));
    table.remove(last).unwrap();

    let fresh = table.insert(set_of(&[TypeId::INT.raw()])).unwrap();
    assert_ne!(fresh & 0xffff_ffff, first & 0xffff_ffff);
    assert_eq!(table.get(first), Err(CoreError::InvalidHandle));
    assert_eq!(table.get(last), Err(CoreError::InvalidHandle));
    assert_eq!(table.get(fresh).unwrap(), &set_of(&[TypeId::INT.raw()]));
    assert_eq!(table.live(), 1);
}

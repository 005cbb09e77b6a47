//! C ABI for the Tyl type-set core (`libtyl_abi`).
//!
//! Exposes [`TypeBitSet`] through opaque handles and a process-wide
//! [`SubtypeLattice`](tyl_types::SubtypeLattice) through value-in, value-out
//! calls. `include/tyl.h` declares the same surface for C callers.
//!
//! # Conventions
//!
//! - Every call returns a [`TylStatus`]; results go through out-pointers.
//!   A null out-pointer, or a null array with a non-zero count, is
//!   `InvalidArgument`.
//! - Handles are `u64`. `0` is the null handle. Every handle returned by an
//!   allocating call must be released with `tyl_set_free` exactly once.
//! - Nothing unwinds across the boundary: every failure is a status code.
//!
//! # Function Categories
//!
//! - **Sets**: `tyl_set_new`, `tyl_set_free`, `tyl_set_insert`,
//!   `tyl_set_contains`, `tyl_set_remove`, `tyl_set_cardinality`,
//!   `tyl_set_is_empty`
//! - **Algebra**: `tyl_set_union`, `tyl_set_intersection`,
//!   `tyl_set_difference`, `tyl_set_union_in_place`,
//!   `tyl_set_intersect_in_place`, `tyl_set_is_subset`,
//!   `tyl_set_union_many`, `tyl_set_intersection_many`
//! - **Bulk**: `tyl_set_from_array`, `tyl_set_to_array`
//! - **Lattice**: `tyl_lattice_add_edge`, `tyl_lattice_set_policy`,
//!   `tyl_lattice_freeze`, `tyl_is_subtype`, `tyl_meet`, `tyl_join`
//! - **Runtime**: `tyl_value_type_id`, `tyl_contract_version`,
//!   `tyl_live_sets`, `tyl_init_logging`
//!
//! # Safety
//!
//! Pointer arguments are trusted to be either null or valid for the stated
//! element count. The functions are not marked `unsafe` because they are
//! FFI entry points, not Rust API functions.

mod cell;
mod handle;
mod status;

use std::sync::Once;

use parking_lot::{const_mutex, Mutex};
use tyl_types::{value_type_id, ChunkWidth, CoreError, SetOp, TypeBitSet, TypeId};

pub use cell::{policy_from_code, LatticeCell};
pub use handle::{HandleTable, NULL_HANDLE};
pub use status::TylStatus;

use status::report;

/// Every set reachable through a handle.
static SETS: Mutex<HandleTable> = const_mutex(HandleTable::new());

/// The process-wide subtype lattice.
static LATTICE: LatticeCell = LatticeCell::new();

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber, once per process.
///
/// Does nothing unless `RUST_LOG` is set, so embedding runtimes pay nothing
/// by default.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // A host that already installed a subscriber keeps it.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}

// ── Pointer plumbing ────────────────────────────────────────────────────

fn out_ref<'a, T>(out: *mut T) -> Result<&'a mut T, CoreError> {
    // SAFETY: a non-null out-pointer is valid for one write of `T`.
    unsafe { out.as_mut() }.ok_or(CoreError::InvalidArgument("null output pointer"))
}

fn input_slice<'a, T>(ptr: *const T, count: usize) -> Result<&'a [T], CoreError> {
    if count == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(CoreError::InvalidArgument("null input array"));
    }
    // SAFETY: the caller guarantees `count` readable elements at `ptr`.
    Ok(unsafe { std::slice::from_raw_parts(ptr, count) })
}

fn output_slice<'a, T>(ptr: *mut T, count: usize) -> Result<&'a mut [T], CoreError> {
    if count == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(CoreError::InvalidArgument("null output buffer"));
    }
    // SAFETY: the caller guarantees `count` writable elements at `ptr`.
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr, count) })
}

// ── Table access ────────────────────────────────────────────────────────

/// Build a new set from the table and hand back its handle.
fn allocate(
    out: *mut u64,
    build: impl FnOnce(&HandleTable) -> Result<TypeBitSet, CoreError>,
) -> Result<(), CoreError> {
    let out = out_ref(out)?;
    let mut sets = SETS.lock();
    let set = build(&sets)?;
    *out = sets.insert(set)?;
    Ok(())
}

/// Read a value out of the table.
fn read<T>(
    out: *mut T,
    query: impl FnOnce(&HandleTable) -> Result<T, CoreError>,
) -> Result<(), CoreError> {
    let out = out_ref(out)?;
    *out = query(&SETS.lock())?;
    Ok(())
}

fn modify(
    handle: u64,
    f: impl FnOnce(&mut TypeBitSet) -> Result<(), CoreError>,
) -> Result<(), CoreError> {
    f(SETS.lock().get_mut(handle)?)
}

/// `target = target <op> source`. `source` may equal `target`.
fn combine_into(target: u64, source: u64, op: SetOp) -> Result<(), CoreError> {
    let mut sets = SETS.lock();
    let other = sets.get(source)?.clone();
    sets.get_mut(target)?.combine_in_place_with(&other, op, ChunkWidth::detect());
    Ok(())
}

/// Fold `handles` with `op`, seeded by a copy of the first set.
fn fold_many(
    handles: *const u64,
    count: usize,
    out: *mut u64,
    op: SetOp,
) -> Result<(), CoreError> {
    let handles = input_slice(handles, count)?;
    allocate(out, |sets| {
        let Some((&first, rest)) = handles.split_first() else {
            return match op {
                SetOp::Union => Ok(TypeBitSet::new()),
                SetOp::Intersection | SetOp::Difference => {
                    Err(CoreError::InvalidArgument("intersection of zero sets"))
                }
            };
        };
        let width = ChunkWidth::detect();
        let mut acc = sets.get(first)?.clone();
        for &handle in rest {
            acc.combine_in_place_with(sets.get(handle)?, op, width);
        }
        Ok(acc)
    })
}

fn copy_out(
    handle: u64,
    buffer: *mut u64,
    capacity: usize,
    out_written: *mut usize,
) -> Result<(), CoreError> {
    let written = out_ref(out_written)?;
    *written = 0;
    let buffer = output_slice(buffer, capacity)?;
    let sets = SETS.lock();
    let set = sets.get(handle)?;

    let mut count = 0;
    for (slot, id) in buffer.iter_mut().zip(set) {
        *slot = id.raw();
        count += 1;
    }
    *written = count;

    let needed = set.cardinality();
    if needed > capacity {
        return Err(CoreError::CapacityExceeded { capacity, needed });
    }
    Ok(())
}

// ── Sets ────────────────────────────────────────────────────────────────

/// Allocate an empty set.
#[no_mangle]
pub extern "C" fn tyl_set_new(out: *mut u64) -> TylStatus {
    report(allocate(out, |_| Ok(TypeBitSet::new())))
}

/// Release a set. The handle is invalid afterwards.
#[no_mangle]
pub extern "C" fn tyl_set_free(handle: u64) -> TylStatus {
    report(SETS.lock().remove(handle).map(drop))
}

#[no_mangle]
pub extern "C" fn tyl_set_insert(handle: u64, id: u64) -> TylStatus {
    report(modify(handle, |set| set.insert(TypeId::from_raw(id)).map(drop)))
}

#[no_mangle]
pub extern "C" fn tyl_set_remove(handle: u64, id: u64) -> TylStatus {
    report(modify(handle, |set| set.remove(TypeId::from_raw(id)).map(drop)))
}

#[no_mangle]
pub extern "C" fn tyl_set_contains(handle: u64, id: u64, out: *mut bool) -> TylStatus {
    report(read(out, |sets| sets.get(handle)?.contains(TypeId::from_raw(id))))
}

#[no_mangle]
pub extern "C" fn tyl_set_cardinality(handle: u64, out: *mut usize) -> TylStatus {
    report(read(out, |sets| Ok(sets.get(handle)?.cardinality())))
}

#[no_mangle]
pub extern "C" fn tyl_set_is_empty(handle: u64, out: *mut bool) -> TylStatus {
    report(read(out, |sets| Ok(sets.get(handle)?.is_empty())))
}

// ── Algebra ─────────────────────────────────────────────────────────────

#[no_mangle]
pub extern "C" fn tyl_set_union(a: u64, b: u64, out: *mut u64) -> TylStatus {
    report(allocate(out, |sets| Ok(sets.get(a)?.union(sets.get(b)?))))
}

#[no_mangle]
pub extern "C" fn tyl_set_intersection(a: u64, b: u64, out: *mut u64) -> TylStatus {
    report(allocate(out, |sets| Ok(sets.get(a)?.intersect(sets.get(b)?))))
}

/// Members of `a` that are not in `b`.
#[no_mangle]
pub extern "C" fn tyl_set_difference(a: u64, b: u64, out: *mut u64) -> TylStatus {
    report(allocate(out, |sets| Ok(sets.get(a)?.difference(sets.get(b)?))))
}

/// `target |= source`.
#[no_mangle]
pub extern "C" fn tyl_set_union_in_place(target: u64, source: u64) -> TylStatus {
    report(combine_into(target, source, SetOp::Union))
}

/// `target &= source`.
#[no_mangle]
pub extern "C" fn tyl_set_intersect_in_place(target: u64, source: u64) -> TylStatus {
    report(combine_into(target, source, SetOp::Intersection))
}

/// Whether every member of `a` is in `b`.
#[no_mangle]
pub extern "C" fn tyl_set_is_subset(a: u64, b: u64, out: *mut bool) -> TylStatus {
    report(read(out, |sets| Ok(sets.get(a)?.is_subset_of(sets.get(b)?))))
}

/// Union of `count` sets. Zero sets give a fresh empty set.
#[no_mangle]
pub extern "C" fn tyl_set_union_many(
    handles: *const u64,
    count: usize,
    out: *mut u64,
) -> TylStatus {
    report(fold_many(handles, count, out, SetOp::Union))
}

/// Intersection of `count` sets. Zero sets is `InvalidArgument`.
#[no_mangle]
pub extern "C" fn tyl_set_intersection_many(
    handles: *const u64,
    count: usize,
    out: *mut u64,
) -> TylStatus {
    report(fold_many(handles, count, out, SetOp::Intersection))
}

// ── Bulk conversion ─────────────────────────────────────────────────────

/// Build a set from `count` ids. Fails without allocating if any id is out
/// of range.
#[no_mangle]
pub extern "C" fn tyl_set_from_array(ids: *const u64, count: usize, out: *mut u64) -> TylStatus {
    report(input_slice(ids, count).and_then(|raw| {
        allocate(out, |_| {
            let ids: Vec<TypeId> = raw.iter().copied().map(TypeId::from_raw).collect();
            TypeBitSet::from_ids(&ids)
        })
    }))
}

/// Write the members of a set to `buffer` in ascending order.
///
/// `out_written` always receives the number of ids written. When the set
/// holds more than `capacity` ids the first `capacity` are written and the
/// call returns `CapacityExceeded`; `tyl_set_cardinality` gives the size to
/// retry with.
#[no_mangle]
pub extern "C" fn tyl_set_to_array(
    handle: u64,
    buffer: *mut u64,
    capacity: usize,
    out_written: *mut usize,
) -> TylStatus {
    report(copy_out(handle, buffer, capacity, out_written))
}

// ── Lattice ─────────────────────────────────────────────────────────────

/// Declare `supertype` as an immediate supertype of `child`.
#[no_mangle]
pub extern "C" fn tyl_lattice_add_edge(child: u64, supertype: u64) -> TylStatus {
    report(
        LATTICE
            .add_edge(TypeId::from_raw(child), TypeId::from_raw(supertype))
            .map(drop),
    )
}

/// Select how `tyl_meet`/`tyl_join` treat incomparable types:
/// `0` direct, `1` common bound.
#[no_mangle]
pub extern "C" fn tyl_lattice_set_policy(policy: u32) -> TylStatus {
    report(policy_from_code(policy).and_then(|policy| LATTICE.set_policy(policy)))
}

#[no_mangle]
pub extern "C" fn tyl_lattice_freeze() -> TylStatus {
    report(LATTICE.freeze())
}

#[no_mangle]
pub extern "C" fn tyl_is_subtype(a: u64, b: u64, out: *mut bool) -> TylStatus {
    report(out_ref(out).and_then(|out| {
        *out = LATTICE.is_subtype(TypeId::from_raw(a), TypeId::from_raw(b))?;
        Ok(())
    }))
}

#[no_mangle]
pub extern "C" fn tyl_meet(a: u64, b: u64, out: *mut u64) -> TylStatus {
    report(out_ref(out).and_then(|out| {
        *out = LATTICE.meet(TypeId::from_raw(a), TypeId::from_raw(b))?.raw();
        Ok(())
    }))
}

#[no_mangle]
pub extern "C" fn tyl_join(a: u64, b: u64, out: *mut u64) -> TylStatus {
    report(out_ref(out).and_then(|out| {
        *out = LATTICE.join(TypeId::from_raw(a), TypeId::from_raw(b))?.raw();
        Ok(())
    }))
}

// ── Runtime ─────────────────────────────────────────────────────────────

/// Type id of a tagged runtime word. `heap_tag` is read only for heap
/// pointers.
#[no_mangle]
pub extern "C" fn tyl_value_type_id(word: u64, heap_tag: u64, out: *mut u64) -> TylStatus {
    report(out_ref(out).and_then(|out| {
        *out = value_type_id(word, TypeId::from_raw(heap_tag))?.raw();
        Ok(())
    }))
}

/// Version of the value-tag layout and builtin numbering.
#[no_mangle]
pub extern "C" fn tyl_contract_version() -> u32 {
    tyl_types::CONTRACT_VERSION
}

/// Number of sets allocated and not yet freed.
#[no_mangle]
pub extern "C" fn tyl_live_sets(out: *mut usize) -> TylStatus {
    report(read(out, |sets| Ok(sets.live())))
}

/// Enable `RUST_LOG`-driven logging for the library.
#[no_mangle]
pub extern "C" fn tyl_init_logging() {
    init_tracing();
}

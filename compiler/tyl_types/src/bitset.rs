//! Fixed-capacity bit set over the type universe.
//!
//! [`TypeBitSet`] stores one bit per [`TypeId`] in a cache-line aligned array
//! of 64 words. There is no storage past the universe bound, so no
//! out-of-range member can ever exist.
//!
//! Binary operations go through [`crate::kernel`] at the process-wide
//! [`ChunkWidth::detect`] width; [`TypeBitSet::combine_with`] runs an
//! explicit width for benchmarking and equivalence testing.

use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use crate::id::UNIVERSE;
use crate::kernel::{self, ChunkWidth, SetOp, Words, WORDS};
use crate::{CoreError, TypeId};

/// 4096-bit membership set of type ids.
#[derive(Clone, PartialEq, Eq, Hash)]
#[repr(C, align(64))]
pub struct TypeBitSet {
    words: Words,
}

impl TypeBitSet {
    /// The empty set.
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Every id in the universe.
    pub const fn full() -> Self {
        Self {
            words: [u64::MAX; WORDS],
        }
    }

    /// Wrap a raw word array. Bit `i % 64` of word `i / 64` is id `i`.
    pub const fn from_words(words: Words) -> Self {
        Self { words }
    }

    /// Build a set from ids. Fails without allocating on the first
    /// out-of-range id.
    pub fn from_ids(ids: &[TypeId]) -> Result<Self, CoreError> {
        let mut set = Self::new();
        set.insert_many(ids)?;
        Ok(set)
    }

    /// Raw word view, for zero-copy hand-off.
    #[inline]
    pub const fn words(&self) -> &Words {
        &self.words
    }

    #[inline]
    fn locate(id: TypeId) -> Result<(usize, u64), CoreError> {
        let index = id.index()?;
        Ok((index / 64, 1u64 << (index % 64)))
    }

    /// Add `id`. Returns whether it was newly inserted.
    #[inline]
    pub fn insert(&mut self, id: TypeId) -> Result<bool, CoreError> {
        Ok(self.insert_slot(id.index()?))
    }

    /// Remove `id`. Returns whether it was present.
    #[inline]
    pub fn remove(&mut self, id: TypeId) -> Result<bool, CoreError> {
        let (word, mask) = Self::locate(id)?;
        let present = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        Ok(present)
    }

    #[inline]
    pub fn contains(&self, id: TypeId) -> Result<bool, CoreError> {
        let (word, mask) = Self::locate(id)?;
        Ok(self.words[word] & mask != 0)
    }

    /// Set the bit for an already-validated id. Returns whether it was clear.
    #[inline]
    pub(crate) fn insert_slot(&mut self, slot: usize) -> bool {
        let (word, mask) = (slot / 64, 1u64 << (slot % 64));
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    /// Insert every id in `ids`.
    ///
    /// All ids are validated first; if any is out of range the set is left
    /// unchanged.
    pub fn insert_many(&mut self, ids: &[TypeId]) -> Result<(), CoreError> {
        if let Some(bad) = ids.iter().find(|id| !id.is_valid()) {
            return Err(CoreError::InvalidTypeId { raw: bad.raw() });
        }
        for &id in ids {
            self.insert(id)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    // === Set algebra ===

    /// `self <op> other` at an explicit chunk width.
    pub fn combine_with(&self, other: &Self, op: SetOp, width: ChunkWidth) -> Self {
        let mut out = Self::new();
        kernel::combine(width, op, &self.words, &other.words, &mut out.words);
        out
    }

    /// `self = self <op> other` at an explicit chunk width.
    pub fn combine_in_place_with(&mut self, other: &Self, op: SetOp, width: ChunkWidth) {
        kernel::combine_in_place(width, op, &mut self.words, &other.words);
    }

    /// Members of either set.
    pub fn union(&self, other: &Self) -> Self {
        self.combine_with(other, SetOp::Union, ChunkWidth::detect())
    }

    /// Members of both sets.
    pub fn intersect(&self, other: &Self) -> Self {
        self.combine_with(other, SetOp::Intersection, ChunkWidth::detect())
    }

    /// Members of `self` not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.combine_with(other, SetOp::Difference, ChunkWidth::detect())
    }

    pub fn union_in_place(&mut self, other: &Self) {
        self.combine_in_place_with(other, SetOp::Union, ChunkWidth::detect());
    }

    pub fn intersect_in_place(&mut self, other: &Self) {
        self.combine_in_place_with(other, SetOp::Intersection, ChunkWidth::detect());
    }

    /// Every id in the universe not in `self`.
    pub fn complement(&self) -> Self {
        let mut out = Self::new();
        for (dst, &w) in out.words.iter_mut().zip(&self.words) {
            *dst = !w;
        }
        out
    }

    /// Whether every member of `self` is a member of `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        kernel::is_subset(ChunkWidth::detect(), &self.words, &other.words)
    }

    /// Number of members.
    pub fn cardinality(&self) -> usize {
        kernel::popcount(&self.words)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Smallest member.
    pub fn first(&self) -> Option<TypeId> {
        self.iter().next()
    }

    /// Largest member.
    pub fn last(&self) -> Option<TypeId> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &w)| w != 0)
            .map(|(i, &w)| TypeId::from_index(i * 64 + 63 - w.leading_zeros() as usize))
    }

    /// Members in ascending numeric order.
    ///
    /// Each call starts a fresh scan of the current contents.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            word: 0,
            pending: self.words[0],
        }
    }

    /// Members in ascending order, collected.
    pub fn to_vec(&self) -> Vec<TypeId> {
        self.iter().collect()
    }
}

impl Default for TypeBitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(TypeId::raw)).finish()
    }
}

impl BitOr for &TypeBitSet {
    type Output = TypeBitSet;

    fn bitor(self, rhs: Self) -> TypeBitSet {
        self.union(rhs)
    }
}

impl BitAnd for &TypeBitSet {
    type Output = TypeBitSet;

    fn bitand(self, rhs: Self) -> TypeBitSet {
        self.intersect(rhs)
    }
}

impl Sub for &TypeBitSet {
    type Output = TypeBitSet;

    fn sub(self, rhs: Self) -> TypeBitSet {
        self.difference(rhs)
    }
}

impl<'a> IntoIterator for &'a TypeBitSet {
    type Item = TypeId;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Ascending iterator over the members of a [`TypeBitSet`].
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    words: &'a Words,
    word: usize,
    /// Bits of `words[word]` not yet yielded.
    pending: u64,
}

impl Iterator for Iter<'_> {
    type Item = TypeId;

    fn next(&mut self) -> Option<TypeId> {
        while self.pending == 0 {
            self.word += 1;
            if self.word >= WORDS {
                return None;
            }
            self.pending = self.words[self.word];
        }
        let bit = self.pending.trailing_zeros() as usize;
        // Clear the lowest set bit.
        self.pending &= self.pending - 1;
        Some(TypeId::from_index(self.word * 64 + bit))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest: usize = self.words[(self.word + 1).min(WORDS)..]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum();
        let n = self.pending.count_ones() as usize + rest;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl std::iter::FusedIterator for Iter<'_> {}

const _: () = assert!(std::mem::size_of::<TypeBitSet>() * 8 == UNIVERSE);
const _: () = assert!(std::mem::align_of::<TypeBitSet>() == 64);

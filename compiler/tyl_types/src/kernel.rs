//! Fixed-width chunk kernels for word-array set algebra.
//!
//! Every binary set operation walks the word array in chunks of
//! [`ChunkWidth::lanes`] words: 4 for 256-bit registers, 2 for 128-bit
//! registers, 1 for the scalar reference loop. The vector widths run
//! `std::arch` kernels (AVX2, SSE2, NEON) from the `simd` submodule.
//!
//! # Contract
//!
//! The chunk width is a performance knob only. For every operation and every
//! input, all widths produce bitwise-identical words. The width-equivalence
//! property tests in `tests/properties.rs` hold the kernels to this.
//!
//! # Selection
//!
//! [`ChunkWidth::detect`] probes the CPU once per process. Setting
//! `TYL_CHUNK_WIDTH` to `scalar`, `128` or `256` overrides the probe. A
//! forced width the CPU lacks falls back to a portable loop of the same
//! lane count.

use std::sync::OnceLock;

use crate::id::UNIVERSE;

mod simd;

/// Number of 64-bit words backing a set.
pub const WORDS: usize = UNIVERSE / 64;

/// Environment variable that forces a chunk width.
pub const CHUNK_WIDTH_ENV: &str = "TYL_CHUNK_WIDTH";

/// The word array of one set.
pub type Words = [u64; WORDS];

// Every width must tile the array exactly.
const _: () = assert!(WORDS % 4 == 0);

/// Number of words processed per kernel step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkWidth {
    /// One word at a time.
    Scalar,
    /// Two words at a time (SSE2, NEON).
    Wide128,
    /// Four words at a time (AVX2).
    Wide256,
}

impl ChunkWidth {
    /// Every width, narrowest first.
    pub const ALL: [Self; 3] = [Self::Scalar, Self::Wide128, Self::Wide256];

    #[inline]
    pub const fn lanes(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Wide128 => 2,
            Self::Wide256 => 4,
        }
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Scalar => 64,
            Self::Wide128 => 128,
            Self::Wide256 => 256,
        }
    }

    /// Parse an override value: `scalar`, `128` or `256`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scalar" | "64" => Some(Self::Scalar),
            "128" => Some(Self::Wide128),
            "256" => Some(Self::Wide256),
            _ => None,
        }
    }

    /// The width used by set operations in this process.
    ///
    /// Resolved once: the `TYL_CHUNK_WIDTH` override if it parses, otherwise
    /// the widest chunk the CPU handles natively.
    pub fn detect() -> Self {
        static ACTIVE: OnceLock<ChunkWidth> = OnceLock::new();
        *ACTIVE.get_or_init(|| {
            let width = match std::env::var(CHUNK_WIDTH_ENV) {
                Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                    tracing::warn!(%value, "ignoring unrecognized {CHUNK_WIDTH_ENV}");
                    Self::from_cpu()
                }),
                Err(_) => Self::from_cpu(),
            };
            tracing::debug!(bits = width.bits(), "selected set kernel width");
            width
        })
    }

    fn from_cpu() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx2") {
                return Self::Wide256;
            }
            if std::arch::is_x86_feature_detected!("sse2") {
                return Self::Wide128;
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return Self::Wide128;
            }
        }
        Self::Scalar
    }
}

/// Binary word-wise set operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SetOp {
    /// `a | b`
    Union,
    /// `a & b`
    Intersection,
    /// `a & !b`
    Difference,
}

impl SetOp {
    #[inline]
    pub const fn apply(self, a: u64, b: u64) -> u64 {
        match self {
            Self::Union => a | b,
            Self::Intersection => a & b,
            Self::Difference => a & !b,
        }
    }
}

/// `out = a <op> b`, walking `width.lanes()` words per step.
pub fn combine(width: ChunkWidth, op: SetOp, a: &Words, b: &Words, out: &mut Words) {
    match width {
        ChunkWidth::Scalar => combine_chunks::<1>(op, a, b, out),
        ChunkWidth::Wide128 => simd::combine_128(op, a, b, out),
        ChunkWidth::Wide256 => simd::combine_256(op, a, b, out),
    }
}

/// `acc = acc <op> other`, walking `width.lanes()` words per step.
pub fn combine_in_place(width: ChunkWidth, op: SetOp, acc: &mut Words, other: &Words) {
    match width {
        ChunkWidth::Scalar => assign_chunks::<1>(op, acc, other),
        ChunkWidth::Wide128 => {
            let lhs = *acc;
            simd::combine_128(op, &lhs, other, acc);
        }
        ChunkWidth::Wide256 => {
            let lhs = *acc;
            simd::combine_256(op, &lhs, other, acc);
        }
    }
}

/// Whether every bit of `a` is also set in `b`. Stops at the first chunk
/// holding a stray bit.
pub fn is_subset(width: ChunkWidth, a: &Words, b: &Words) -> bool {
    match width {
        ChunkWidth::Scalar => subset_chunks::<1>(a, b),
        ChunkWidth::Wide128 => simd::is_subset_128(a, b),
        ChunkWidth::Wide256 => simd::is_subset_256(a, b),
    }
}

/// Total number of set bits. At most 4096, so the sum cannot overflow.
pub fn popcount(words: &Words) -> usize {
    words.iter().map(|w| w.count_ones() as usize).sum()
}

fn combine_chunks<const L: usize>(op: SetOp, a: &Words, b: &Words, out: &mut Words) {
    match op {
        SetOp::Union => zip_chunks::<L>(a, b, out, |x, y| x | y),
        SetOp::Intersection => zip_chunks::<L>(a, b, out, |x, y| x & y),
        SetOp::Difference => zip_chunks::<L>(a, b, out, |x, y| x & !y),
    }
}

fn assign_chunks<const L: usize>(op: SetOp, acc: &mut Words, other: &Words) {
    match op {
        SetOp::Union => fold_chunks::<L>(acc, other, |x, y| x | y),
        SetOp::Intersection => fold_chunks::<L>(acc, other, |x, y| x & y),
        SetOp::Difference => fold_chunks::<L>(acc, other, |x, y| x & !y),
    }
}

#[inline(always)]
fn zip_chunks<const L: usize>(a: &Words, b: &Words, out: &mut Words, f: impl Fn(u64, u64) -> u64) {
    let chunks = out
        .chunks_exact_mut(L)
        .zip(a.chunks_exact(L))
        .zip(b.chunks_exact(L));
    for ((dst, lhs), rhs) in chunks {
        for ((d, &x), &y) in dst.iter_mut().zip(lhs).zip(rhs) {
            *d = f(x, y);
        }
    }
}

#[inline(always)]
fn fold_chunks<const L: usize>(acc: &mut Words, other: &Words, f: impl Fn(u64, u64) -> u64) {
    for (dst, rhs) in acc.chunks_exact_mut(L).zip(other.chunks_exact(L)) {
        for (d, &y) in dst.iter_mut().zip(rhs) {
            *d = f(*d, y);
        }
    }
}

#[inline(always)]
fn subset_chunks<const L: usize>(a: &Words, b: &Words) -> bool {
    a.chunks_exact(L).zip(b.chunks_exact(L)).all(|(lhs, rhs)| {
        let stray = lhs
            .iter()
            .zip(rhs)
            .fold(0u64, |stray, (&x, &y)| stray | (x & !y));
        stray == 0
    })
}

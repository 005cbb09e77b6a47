//! Vector kernels for the 128- and 256-bit chunk widths.
//!
//! `Wide128` runs SSE2 on x86_64 and NEON on aarch64; both are baseline on
//! those targets. `Wide256` runs AVX2 after a runtime feature check. When the
//! instructions are missing (another target, or a width forced through
//! `TYL_CHUNK_WIDTH` on an older CPU), the portable lane-group loop runs
//! instead, so every width stays sound on every host.

#![allow(unsafe_code, reason = "std::arch intrinsics require unsafe")]

use super::{combine_chunks, subset_chunks, SetOp, Words};

pub(super) fn combine_128(op: SetOp, a: &Words, b: &Words, out: &mut Words) {
    #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
    {
        x86::combine_sse2(op, a, b, out);
    }
    #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
    {
        neon::combine_neon(op, a, b, out);
    }
    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "sse2"),
        all(target_arch = "aarch64", target_feature = "neon")
    )))]
    {
        combine_chunks::<2>(op, a, b, out);
    }
}

pub(super) fn is_subset_128(a: &Words, b: &Words) -> bool {
    #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
    {
        x86::is_subset_sse2(a, b)
    }
    #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
    {
        neon::is_subset_neon(a, b)
    }
    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "sse2"),
        all(target_arch = "aarch64", target_feature = "neon")
    )))]
    {
        subset_chunks::<2>(a, b)
    }
}

pub(super) fn combine_256(op: SetOp, a: &Words, b: &Words, out: &mut Words) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 support was checked just above.
            unsafe { x86::combine_avx2(op, a, b, out) };
            return;
        }
    }
    combine_chunks::<4>(op, a, b, out);
}

pub(super) fn is_subset_256(a: &Words, b: &Words) -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 support was checked just above.
            return unsafe { x86::is_subset_avx2(a, b) };
        }
    }
    subset_chunks::<4>(a, b)
}

#[cfg(target_arch = "x86_64")]
#[allow(
    clippy::cast_ptr_alignment,
    reason = "every load and store is the unaligned form"
)]
mod x86 {
    use std::arch::x86_64::{
        __m128i, __m256i, _mm256_and_si256, _mm256_andnot_si256, _mm256_loadu_si256,
        _mm256_or_si256, _mm256_storeu_si256, _mm256_testz_si256, _mm_and_si128,
        _mm_andnot_si128, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8, _mm_or_si128,
        _mm_setzero_si128, _mm_storeu_si128,
    };

    use crate::kernel::{SetOp, Words, WORDS};

    /// 128-bit registers per word array.
    const XMM: usize = WORDS / 2;
    /// 256-bit registers per word array.
    const YMM: usize = WORDS / 4;

    #[cfg(target_feature = "sse2")]
    pub(super) fn combine_sse2(op: SetOp, a: &Words, b: &Words, out: &mut Words) {
        let a = a.as_ptr().cast::<__m128i>();
        let b = b.as_ptr().cast::<__m128i>();
        let out = out.as_mut_ptr().cast::<__m128i>();
        // SAFETY: SSE2 is enabled for this target. Each array is exactly `XMM`
        // 128-bit chunks, and the loads and stores do not require alignment.
        unsafe {
            for i in 0..XMM {
                let x = _mm_loadu_si128(a.add(i));
                let y = _mm_loadu_si128(b.add(i));
                let r = match op {
                    SetOp::Union => _mm_or_si128(x, y),
                    SetOp::Intersection => _mm_and_si128(x, y),
                    // andnot(p, q) is !p & q
                    SetOp::Difference => _mm_andnot_si128(y, x),
                };
                _mm_storeu_si128(out.add(i), r);
            }
        }
    }

    #[cfg(target_feature = "sse2")]
    pub(super) fn is_subset_sse2(a: &Words, b: &Words) -> bool {
        let a = a.as_ptr().cast::<__m128i>();
        let b = b.as_ptr().cast::<__m128i>();
        // SAFETY: as in `combine_sse2`.
        unsafe {
            let zero = _mm_setzero_si128();
            for i in 0..XMM {
                let stray = _mm_andnot_si128(_mm_loadu_si128(b.add(i)), _mm_loadu_si128(a.add(i)));
                if _mm_movemask_epi8(_mm_cmpeq_epi8(stray, zero)) != 0xffff {
                    return false;
                }
            }
        }
        true
    }

    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn combine_avx2(op: SetOp, a: &Words, b: &Words, out: &mut Words) {
        let a = a.as_ptr().cast::<__m256i>();
        let b = b.as_ptr().cast::<__m256i>();
        let out = out.as_mut_ptr().cast::<__m256i>();
        // SAFETY: each array is exactly `YMM` 256-bit chunks, and the loads
        // and stores do not require alignment.
        unsafe {
            for i in 0..YMM {
                let x = _mm256_loadu_si256(a.add(i));
                let y = _mm256_loadu_si256(b.add(i));
                let r = match op {
                    SetOp::Union => _mm256_or_si256(x, y),
                    SetOp::Intersection => _mm256_and_si256(x, y),
                    SetOp::Difference => _mm256_andnot_si256(y, x),
                };
                _mm256_storeu_si256(out.add(i), r);
            }
        }
    }

    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn is_subset_avx2(a: &Words, b: &Words) -> bool {
        let a = a.as_ptr().cast::<__m256i>();
        let b = b.as_ptr().cast::<__m256i>();
        // SAFETY: as in `combine_avx2`.
        unsafe {
            for i in 0..YMM {
                let stray =
                    _mm256_andnot_si256(_mm256_loadu_si256(b.add(i)), _mm256_loadu_si256(a.add(i)));
                if _mm256_testz_si256(stray, stray) == 0 {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
mod neon {
    use std::arch::aarch64::{
        vandq_u64, vbicq_u64, vld1q_u64, vmaxvq_u32, vorrq_u64, vreinterpretq_u32_u64,
        vst1q_u64,
    };

    use crate::kernel::{SetOp, Words, WORDS};

    pub(super) fn combine_neon(op: SetOp, a: &Words, b: &Words, out: &mut Words) {
        let (a, b, out) = (a.as_ptr(), b.as_ptr(), out.as_mut_ptr());
        // SAFETY: NEON is enabled for this target. Every load and store
        // covers words `i` and `i + 1`, and `i + 1 < WORDS`.
        unsafe {
            for i in (0..WORDS).step_by(2) {
                let x = vld1q_u64(a.add(i));
                let y = vld1q_u64(b.add(i));
                let r = match op {
                    SetOp::Union => vorrq_u64(x, y),
                    SetOp::Intersection => vandq_u64(x, y),
                    // bic(p, q) is p & !q
                    SetOp::Difference => vbicq_u64(x, y),
                };
                vst1q_u64(out.add(i), r);
            }
        }
    }

    pub(super) fn is_subset_neon(a: &Words, b: &Words) -> bool {
        let (a, b) = (a.as_ptr(), b.as_ptr());
        // SAFETY: as in `combine_neon`.
        unsafe {
            for i in (0..WORDS).step_by(2) {
                let stray = vbicq_u64(vld1q_u64(a.add(i)), vld1q_u64(b.add(i)));
                if vmaxvq_u32(vreinterpretq_u32_u64(stray)) != 0 {
                    return false;
                }
            }
        }
        true
    }
}

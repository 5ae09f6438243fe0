/*!
 * SIMD Backend
 * Raw byte operations using AVX2/SSE2 on x86_64 and NEON on aarch64
 */

use super::{capabilities, MemoryBackend, PortableBackend};
use crate::core::limits::{BIG_BLOCK_CHUNK, MEMORY_SIMD_THRESHOLD as SIMD_THRESHOLD};
use std::ptr;

/// Backend that dispatches to the widest vector unit detected at startup
///
/// Below the SIMD threshold every operation takes the scalar path, where the
/// vector setup cost outweighs the gain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimdBackend;

impl MemoryBackend for SimdBackend {
    const NAME: &'static str = "simd";

    unsafe fn copy(dst: *mut u8, src: *const u8, len: usize) {
        if len < SIMD_THRESHOLD {
            ptr::copy_nonoverlapping(src, dst, len);
            return;
        }

        #[cfg(target_arch = "x86_64")]
        {
            let caps = capabilities();
            if caps.avx2 {
                return copy_avx2(dst, src, len);
            }
            if caps.sse2 {
                return copy_sse2(dst, src, len);
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            if capabilities().neon {
                return copy_neon(dst, src, len);
            }
        }

        ptr::copy_nonoverlapping(src, dst, len);
    }

    unsafe fn move_bytes(dst: *mut u8, src: *const u8, len: usize) {
        let (d, s) = (dst as usize, src as usize);
        if d == s || len == 0 {
            return;
        }

        if d + len <= s || s + len <= d {
            Self::copy(dst, src, len);
        } else {
            // Overlapping: memmove picks the safe direction
            ptr::copy(src, dst, len);
        }
    }

    unsafe fn compare(a: *const u8, b: *const u8, len: usize) -> i32 {
        if len >= SIMD_THRESHOLD {
            #[cfg(target_arch = "x86_64")]
            {
                let caps = capabilities();
                if caps.avx2 {
                    return compare_avx2(a, b, len);
                }
                if caps.sse2 {
                    return compare_sse2(a, b, len);
                }
            }
        }

        PortableBackend::compare(a, b, len)
    }

    unsafe fn fill(dst: *mut u8, value: u8, len: usize) {
        if len < SIMD_THRESHOLD {
            ptr::write_bytes(dst, value, len);
            return;
        }

        #[cfg(target_arch = "x86_64")]
        {
            let caps = capabilities();
            if caps.avx2 {
                return fill_avx2(dst, value, len);
            }
            if caps.sse2 {
                return fill_sse2(dst, value, len);
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            if capabilities().neon {
                return fill_neon(dst, value, len);
            }
        }

        ptr::write_bytes(dst, value, len);
    }

    unsafe fn swap(a: *mut u8, b: *mut u8, len: usize) {
        #[cfg(target_arch = "x86_64")]
        {
            if len >= SIMD_THRESHOLD && capabilities().avx2 {
                return swap_avx2(a, b, len);
            }
        }

        ptr::swap_nonoverlapping(a, b, len);
    }

    unsafe fn big_block_copy(dst: *mut u8, src: *const u8, len: usize) {
        let mut offset = 0;
        while offset < len {
            let chunk = BIG_BLOCK_CHUNK.min(len - offset);
            let next = offset + chunk;
            if next < len {
                prefetch(src.add(next));
            }
            Self::copy(dst.add(offset), src.add(offset), chunk);
            offset = next;
        }
    }

    unsafe fn streaming_copy(dst: *mut u8, src: *const u8, len: usize) {
        if len < SIMD_THRESHOLD {
            ptr::copy_nonoverlapping(src, dst, len);
            return;
        }

        #[cfg(target_arch = "x86_64")]
        {
            if capabilities().sse2 {
                return streaming_copy_sse2(dst, src, len);
            }
        }

        Self::copy(dst, src, len);
    }
}

#[inline(always)]
unsafe fn prefetch(_addr: *const u8) {
    #[cfg(target_arch = "x86_64")]
    {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch::<_MM_HINT_T0>(_addr as *const i8);
    }
}

// x86_64 AVX2 implementations
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn copy_avx2(dst: *mut u8, src: *const u8, len: usize) {
    use std::arch::x86_64::*;

    let mut offset = 0;

    // Process 32 bytes at a time with AVX2
    while offset + 32 <= len {
        let data = _mm256_loadu_si256(src.add(offset) as *const __m256i);
        _mm256_storeu_si256(dst.add(offset) as *mut __m256i, data);
        offset += 32;
    }

    ptr::copy_nonoverlapping(src.add(offset), dst.add(offset), len - offset);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn compare_avx2(a: *const u8, b: *const u8, len: usize) -> i32 {
    use std::arch::x86_64::*;

    let mut offset = 0;

    while offset + 32 <= len {
        let va = _mm256_loadu_si256(a.add(offset) as *const __m256i);
        let vb = _mm256_loadu_si256(b.add(offset) as *const __m256i);
        let mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(va, vb)) as u32;

        if mask != u32::MAX {
            let i = offset + (!mask).trailing_zeros() as usize;
            return *a.add(i) as i32 - *b.add(i) as i32;
        }

        offset += 32;
    }

    PortableBackend::compare(a.add(offset), b.add(offset), len - offset)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn fill_avx2(dst: *mut u8, value: u8, len: usize) {
    use std::arch::x86_64::*;

    let pattern = _mm256_set1_epi8(value as i8);
    let mut offset = 0;

    while offset + 32 <= len {
        _mm256_storeu_si256(dst.add(offset) as *mut __m256i, pattern);
        offset += 32;
    }

    ptr::write_bytes(dst.add(offset), value, len - offset);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn swap_avx2(a: *mut u8, b: *mut u8, len: usize) {
    use std::arch::x86_64::*;

    let mut offset = 0;

    while offset + 32 <= len {
        let pa = a.add(offset) as *mut __m256i;
        let pb = b.add(offset) as *mut __m256i;
        let va = _mm256_loadu_si256(pa);
        let vb = _mm256_loadu_si256(pb);
        _mm256_storeu_si256(pa, vb);
        _mm256_storeu_si256(pb, va);
        offset += 32;
    }

    ptr::swap_nonoverlapping(a.add(offset), b.add(offset), len - offset);
}

// x86_64 SSE2 implementations
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn copy_sse2(dst: *mut u8, src: *const u8, len: usize) {
    use std::arch::x86_64::*;

    let mut offset = 0;

    // Process 16 bytes at a time with SSE2
    while offset + 16 <= len {
        let data = _mm_loadu_si128(src.add(offset) as *const __m128i);
        _mm_storeu_si128(dst.add(offset) as *mut __m128i, data);
        offset += 16;
    }

    ptr::copy_nonoverlapping(src.add(offset), dst.add(offset), len - offset);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn compare_sse2(a: *const u8, b: *const u8, len: usize) -> i32 {
    use std::arch::x86_64::*;

    let mut offset = 0;

    while offset + 16 <= len {
        let va = _mm_loadu_si128(a.add(offset) as *const __m128i);
        let vb = _mm_loadu_si128(b.add(offset) as *const __m128i);
        let mask = _mm_movemask_epi8(_mm_cmpeq_epi8(va, vb)) as u32;

        if mask != 0xFFFF {
            let i = offset + (!mask & 0xFFFF).trailing_zeros() as usize;
            return *a.add(i) as i32 - *b.add(i) as i32;
        }

        offset += 16;
    }

    PortableBackend::compare(a.add(offset), b.add(offset), len - offset)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn fill_sse2(dst: *mut u8, value: u8, len: usize) {
    use std::arch::x86_64::*;

    let pattern = _mm_set1_epi8(value as i8);
    let mut offset = 0;

    while offset + 16 <= len {
        _mm_storeu_si128(dst.add(offset) as *mut __m128i, pattern);
        offset += 16;
    }

    ptr::write_bytes(dst.add(offset), value, len - offset);
}

/// Non-temporal copy: stores bypass the cache so a one-shot transfer does not
/// evict the working set
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn streaming_copy_sse2(dst: *mut u8, src: *const u8, len: usize) {
    use std::arch::x86_64::*;

    // Streaming stores need a 16-byte aligned destination
    let head = dst.align_offset(16).min(len);
    ptr::copy_nonoverlapping(src, dst, head);

    let mut offset = head;
    while offset + 16 <= len {
        let data = _mm_loadu_si128(src.add(offset) as *const __m128i);
        _mm_stream_si128(dst.add(offset) as *mut __m128i, data);
        offset += 16;
    }
    _mm_sfence();

    ptr::copy_nonoverlapping(src.add(offset), dst.add(offset), len - offset);
}

// ARM NEON implementations
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn copy_neon(dst: *mut u8, src: *const u8, len: usize) {
    use std::arch::aarch64::*;

    let mut offset = 0;

    // Process 16 bytes at a time with NEON
    while offset + 16 <= len {
        let data = vld1q_u8(src.add(offset));
        vst1q_u8(dst.add(offset), data);
        offset += 16;
    }

    ptr::copy_nonoverlapping(src.add(offset), dst.add(offset), len - offset);
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn fill_neon(dst: *mut u8, value: u8, len: usize) {
    use std::arch::aarch64::*;

    let pattern = vdupq_n_u8(value);
    let mut offset = 0;

    while offset + 16 <= len {
        vst1q_u8(dst.add(offset), pattern);
        offset += 16;
    }

    ptr::write_bytes(dst.add(offset), value, len - offset);
}

/*!
 * Platform Memory Backend
 *
 * Raw, unchecked byte primitives underneath the allocator: copy, overlapping
 * move, compare, fill, zero, swap, and two large-transfer copy variants.
 *
 * One implementation is chosen per build target through [`PlatformBackend`]
 * and injected into the subsystem as a type parameter, so every call is
 * statically dispatched.
 */

mod platform;
mod portable;
mod simd;

pub use platform::{detect_simd_support, SimdCapabilities};
pub use portable::PortableBackend;
pub use simd::SimdBackend;

use crate::core::limits::{BIG_BLOCK_THRESHOLD, STREAMING_THRESHOLD};
use std::cmp::Ordering;
use std::mem::size_of;
use std::sync::OnceLock;

/// Raw byte operations implemented per target
///
/// # Safety
///
/// Every operation trusts its caller completely. Pointers must be valid for
/// `len` bytes of the access performed, and only `move_bytes` tolerates
/// overlapping regions.
pub trait MemoryBackend: Send + Sync + 'static {
    /// Short name for logs and benchmarks
    const NAME: &'static str;

    /// Copy `len` bytes between non-overlapping regions
    unsafe fn copy(dst: *mut u8, src: *const u8, len: usize);

    /// Copy `len` bytes between possibly overlapping regions
    unsafe fn move_bytes(dst: *mut u8, src: *const u8, len: usize);

    /// Byte-wise ordering of two regions: negative, zero, or positive
    unsafe fn compare(a: *const u8, b: *const u8, len: usize) -> i32;

    /// Set `len` bytes to `value`
    unsafe fn fill(dst: *mut u8, value: u8, len: usize);

    /// Set `len` bytes to zero
    #[inline]
    unsafe fn zero(dst: *mut u8, len: usize) {
        Self::fill(dst, 0, len);
    }

    /// Exchange `len` bytes between two disjoint regions
    unsafe fn swap(a: *mut u8, b: *mut u8, len: usize);

    /// `copy` tuned for throughput on very large blocks
    #[inline]
    unsafe fn big_block_copy(dst: *mut u8, src: *const u8, len: usize) {
        Self::copy(dst, src, len);
    }

    /// `copy` that avoids polluting the cache with the destination
    #[inline]
    unsafe fn streaming_copy(dst: *mut u8, src: *const u8, len: usize) {
        Self::copy(dst, src, len);
    }
}

/// Backend selected for this build target
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
pub type PlatformBackend = SimdBackend;

/// Backend selected for this build target
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub type PlatformBackend = PortableBackend;

/// Which copy routine suits a transfer of `len` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTier {
    Standard,
    BigBlock,
    Streaming,
}

impl CopyTier {
    /// Pick a tier from the transfer size alone
    pub fn for_len(len: usize) -> Self {
        if len >= STREAMING_THRESHOLD {
            CopyTier::Streaming
        } else if len >= BIG_BLOCK_THRESHOLD {
            CopyTier::BigBlock
        } else {
            CopyTier::Standard
        }
    }

    /// Run the tier's copy routine on `B`
    ///
    /// # Safety
    /// Same contract as [`MemoryBackend::copy`].
    #[inline]
    pub unsafe fn copy<B: MemoryBackend>(self, dst: *mut u8, src: *const u8, len: usize) {
        match self {
            CopyTier::Standard => B::copy(dst, src, len),
            CopyTier::BigBlock => B::big_block_copy(dst, src, len),
            CopyTier::Streaming => B::streaming_copy(dst, src, len),
        }
    }
}

/// Global SIMD capabilities
static SIMD_CAPS: OnceLock<SimdCapabilities> = OnceLock::new();

/// Initialize SIMD capabilities detection
pub fn init_backend() -> &'static SimdCapabilities {
    SIMD_CAPS.get_or_init(|| {
        let caps = platform::detect_simd_support();
        tracing::info!(
            backend = PlatformBackend::NAME,
            sse2 = caps.sse2,
            avx2 = caps.avx2,
            neon = caps.neon,
            max_vector_bytes = caps.max_vector_bytes(),
            "Memory backend capabilities detected"
        );
        caps
    })
}

/// Get SIMD capabilities
#[inline]
pub fn capabilities() -> &'static SimdCapabilities {
    SIMD_CAPS.get_or_init(platform::detect_simd_support)
}

// Safe slice wrappers over the platform backend

/// Copy `min(dst.len(), src.len())` bytes; returns the count copied
pub fn copy_slice(dst: &mut [u8], src: &[u8]) -> usize {
    let len = dst.len().min(src.len());
    // Borrow rules guarantee the slices are disjoint
    unsafe { CopyTier::for_len(len).copy::<PlatformBackend>(dst.as_mut_ptr(), src.as_ptr(), len) };
    len
}

/// Move `len` bytes from `src` to `dst` within one buffer
///
/// # Panics
/// If either range falls outside `buf`.
pub fn move_within(buf: &mut [u8], src: usize, dst: usize, len: usize) {
    assert!(src.checked_add(len).is_some_and(|end| end <= buf.len()));
    assert!(dst.checked_add(len).is_some_and(|end| end <= buf.len()));
    let base = buf.as_mut_ptr();
    unsafe { PlatformBackend::move_bytes(base.add(dst), base.add(src), len) };
}

/// Compare the common prefix of two slices, then their lengths
pub fn compare_slices(a: &[u8], b: &[u8]) -> Ordering {
    let len = a.len().min(b.len());
    let prefix = unsafe { PlatformBackend::compare(a.as_ptr(), b.as_ptr(), len) };
    prefix.cmp(&0).then(a.len().cmp(&b.len()))
}

/// Set every byte of `dst` to `value`
pub fn fill_slice(dst: &mut [u8], value: u8) {
    unsafe { PlatformBackend::fill(dst.as_mut_ptr(), value, dst.len()) };
}

/// Zero every byte of `dst`
pub fn zero_slice(dst: &mut [u8]) {
    unsafe { PlatformBackend::zero(dst.as_mut_ptr(), dst.len()) };
}

/// Exchange the contents of two equally sized slices
///
/// # Panics
/// If the lengths differ.
pub fn swap_slices(a: &mut [u8], b: &mut [u8]) {
    assert_eq!(a.len(), b.len(), "swap_slices requires equal lengths");
    unsafe { PlatformBackend::swap(a.as_mut_ptr(), b.as_mut_ptr(), a.len()) };
}

// Typed helpers over a single value

/// Set every byte of `value` to `byte`
///
/// # Safety
/// The resulting bit pattern must be a valid `T`.
#[inline]
pub unsafe fn mem_set<T>(value: &mut T, byte: u8) {
    PlatformBackend::fill(value as *mut T as *mut u8, byte, size_of::<T>());
}

/// Zero every byte of `value`
///
/// # Safety
/// All-zero bytes must be a valid `T`.
#[inline]
pub unsafe fn mem_zero<T>(value: &mut T) {
    PlatformBackend::zero(value as *mut T as *mut u8, size_of::<T>());
}

/// Bytewise copy of `src` into `dst`
#[inline]
pub fn mem_copy<T: Copy>(dst: &mut T, src: &T) {
    // Distinct borrows never overlap
    unsafe {
        PlatformBackend::copy(dst as *mut T as *mut u8, src as *const T as *const u8, size_of::<T>())
    };
}

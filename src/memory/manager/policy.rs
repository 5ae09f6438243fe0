/*!
 * Alignment Policy and Size Classes
 *
 * Resolves requested alignments and quantizes sizes into the step table that
 * growable containers use to pick slack-aware capacities.
 */

use crate::core::limits::{
    DEFAULT_ALIGNMENT, LARGE_ALIGNMENT_THRESHOLD, LARGE_BLOCK_ALIGNMENT, MAX_CLASS_SIZE,
    MIN_ALIGNMENT, PAGE_SIZE,
};
use crate::memory::types::{MemoryError, MemoryResult};

/// Maps a request to the alignment the allocator will honor
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentPolicy;

impl AlignmentPolicy {
    /// Resolve `alignment` for a block of `size` bytes
    ///
    /// - `DEFAULT_ALIGNMENT`: 16 for blocks of 16 bytes or more, else 8
    /// - explicit values below `MIN_ALIGNMENT` are promoted to it
    /// - anything else must be a power of two
    #[inline]
    pub fn resolve(size: usize, alignment: usize) -> MemoryResult<usize> {
        if alignment == DEFAULT_ALIGNMENT {
            return Ok(if size >= LARGE_ALIGNMENT_THRESHOLD {
                LARGE_BLOCK_ALIGNMENT
            } else {
                MIN_ALIGNMENT
            });
        }

        if !alignment.is_power_of_two() {
            return Err(MemoryError::InvalidAlignment(alignment));
        }

        Ok(alignment.max(MIN_ALIGNMENT))
    }
}

// 8 bytes, 16B..128B (step 16), then four steps per doubling up to 64KB
pub(crate) const SIZE_CLASSES: &[usize] = &[
    8, 16, 32, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 640, 768, 896,
    1024, 1280, 1536, 1792, 2048, 2560, 3072, 3584, 4096, 5120, 6144, 7168, 8192, 10240, 12288,
    14336, 16384, 20480, 24576, 28672, 32768, 40960, 49152, 57344, 65536,
];

/// Step function from requested size to usable size
///
/// The result for a given alignment is the smallest member of a fixed set
/// that is not below the request. That set is zero, every table class that
/// is a multiple of the alignment, and every multiple of
/// `max(PAGE_SIZE, alignment)` past the table. Taking the minimum of a fixed
/// set makes the function monotone and idempotent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeClassTable;

impl SizeClassTable {
    /// Quantize `size` for an already resolved `alignment`
    ///
    /// Returns `None` if the rounded size overflows `usize`.
    pub fn quantize_resolved(size: usize, alignment: usize) -> Option<usize> {
        if size == 0 {
            return Some(0);
        }

        if size <= MAX_CLASS_SIZE {
            let start = SIZE_CLASSES.partition_point(|&class| class < size);
            if let Some(&class) = SIZE_CLASSES[start..]
                .iter()
                .find(|&&class| class % alignment == 0)
            {
                return Some(class);
            }
        }

        let step = alignment.max(PAGE_SIZE);
        size.checked_add(step - 1).map(|s| s & !(step - 1))
    }

    /// Usable size an allocation request would produce
    pub fn quantize(size: usize, alignment: usize) -> MemoryResult<usize> {
        let resolved = AlignmentPolicy::resolve(size, alignment)?;
        Self::quantize_resolved(size, resolved).ok_or(MemoryError::SizeOverflow {
            requested: size,
            alignment: resolved,
        })
    }

    /// Number of entries in the class table
    pub fn class_count() -> usize {
        SIZE_CLASSES.len()
    }
}

/*!
 * Memory Traits
 * Allocation interface every dependent component codes against
 */

use super::backend::MemoryBackend;
use super::manager::MemorySubsystem;
use super::types::*;
use crate::core::types::Size;

/// Memory allocator interface
///
/// Object safe, so components can hold `&dyn Allocator` without naming the
/// backend.
pub trait Allocator: Send + Sync {
    /// Allocate at least `size` bytes; exhaustion is fatal
    fn allocate(&self, size: Size, alignment: usize) -> Block;

    /// Resize, allocate (`None`) or release (`new_size == 0`)
    fn reallocate(&self, block: Option<Block>, new_size: Size, alignment: usize) -> Option<Block>;

    /// Return a block
    fn release(&self, block: Block);

    /// Usable size of a live block
    fn query_size(&self, block: &Block) -> Size;

    /// Usable size an allocation of `size` would receive
    fn quantize_size(&self, size: Size, alignment: usize) -> Size;
}

/// Memory statistics provider
pub trait MemoryInfo: Send + Sync {
    /// Get overall memory statistics
    fn stats(&self) -> MemoryStats;

    /// Metadata of every tracked block
    fn live_blocks(&self) -> Vec<BlockInfo>;
}

impl<B: MemoryBackend> Allocator for MemorySubsystem<B> {
    #[inline]
    fn allocate(&self, size: Size, alignment: usize) -> Block {
        MemorySubsystem::allocate(self, size, alignment)
    }

    #[inline]
    fn reallocate(&self, block: Option<Block>, new_size: Size, alignment: usize) -> Option<Block> {
        MemorySubsystem::reallocate(self, block, new_size, alignment)
    }

    #[inline]
    fn release(&self, block: Block) {
        MemorySubsystem::release(self, block)
    }

    #[inline]
    fn query_size(&self, block: &Block) -> Size {
        MemorySubsystem::query_size(self, block)
    }

    #[inline]
    fn quantize_size(&self, size: Size, alignment: usize) -> Size {
        MemorySubsystem::quantize_size(self, size, alignment)
    }
}

impl<B: MemoryBackend> MemoryInfo for MemorySubsystem<B> {
    fn stats(&self) -> MemoryStats {
        MemorySubsystem::stats(self)
    }

    fn live_blocks(&self) -> Vec<BlockInfo> {
        MemorySubsystem::live_blocks(self)
    }
}

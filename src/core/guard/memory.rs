/*!
 * Memory Guards
 *
 * RAII guard for scoped block allocations with automatic release
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::types::Size;
use crate::memory::backend::{MemoryBackend, PlatformBackend};
use crate::memory::manager::MemorySubsystem;
use crate::memory::types::Block;
use tracing::{error, trace};

/// Scoped block with automatic release
///
/// # Example
///
/// ```ignore
/// let guard = memory.allocate_guard(1024, 0);
/// let addr = guard.address();
/// // Use memory...
/// // Automatically released on drop
/// ```
pub struct MemoryGuard<'a, B: MemoryBackend = PlatformBackend> {
    block: Option<Block>,
    len: Size,
    memory: &'a MemorySubsystem<B>,
    metadata: GuardMetadata,
}

impl<'a, B: MemoryBackend> MemoryGuard<'a, B> {
    /// Take ownership of `block`, exposing its first `len` bytes
    ///
    /// `len` must not exceed the block's usable size.
    #[inline]
    pub fn new(memory: &'a MemorySubsystem<B>, block: Block, len: Size) -> Self {
        let info = memory.block_info(&block);
        debug_assert!(len <= info.usable);

        let metadata = GuardMetadata::new("memory")
            .with_size(len)
            .with_alignment(info.alignment);
        trace!(address = info.address, len, "Memory guard created");

        Self {
            block: Some(block),
            len,
            memory,
            metadata,
        }
    }

    /// Address of the block, or 0 once released
    #[inline]
    pub fn address(&self) -> usize {
        self.block.as_ref().map_or(0, Block::address)
    }

    /// Bytes exposed through the slice accessors
    #[inline]
    pub fn len(&self) -> Size {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Usable size of the underlying block, or 0 once released
    pub fn usable(&self) -> Size {
        self.block
            .as_ref()
            .map_or(0, |block| self.memory.query_size(block))
    }

    /// Guarded bytes; empty once released
    pub fn as_slice(&self) -> &[u8] {
        match &self.block {
            Some(block) => unsafe { std::slice::from_raw_parts(block.as_ptr(), self.len) },
            None => &[],
        }
    }

    /// Guarded bytes, mutably; empty once released
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &self.block {
            Some(block) => unsafe { std::slice::from_raw_parts_mut(block.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// Manually release without waiting for Drop
    ///
    /// Useful for early cleanup
    pub fn release_early(mut self) -> GuardResult<()> {
        self.release()?;
        // Prevent Drop from running
        std::mem::forget(self);
        Ok(())
    }

    /// Stop guarding and hand the block back to the caller
    pub fn into_block(mut self) -> Option<Block> {
        self.block.take()
    }
}

impl<B: MemoryBackend> Guard for MemoryGuard<'_, B> {
    fn resource_type(&self) -> &'static str {
        "memory"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.block.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        let block = self.block.take().ok_or(GuardError::AlreadyReleased)?;
        let address = block.address();
        self.memory.release(block);

        trace!(
            address,
            lifetime_us = self.metadata.lifetime_micros(),
            "Memory guard released"
        );
        Ok(())
    }
}

impl<B: MemoryBackend> GuardDrop for MemoryGuard<'_, B> {
    fn on_drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                error!(error = %e, "Memory guard drop failed");
            }
        }
    }
}

impl<B: MemoryBackend> Drop for MemoryGuard<'_, B> {
    #[inline]
    fn drop(&mut self) {
        self.on_drop();
    }
}

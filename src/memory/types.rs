/*!
 * Memory Types
 * Common types for memory management
 */

use crate::core::limits::DEFAULT_ALIGNMENT;
use crate::core::types::{Address, Size};
use serde::{Deserialize, Serialize};
use std::ptr::NonNull;

pub use crate::core::errors::{MemoryError, MemoryResult};

/// Memory allocation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub size: Size,
    /// `DEFAULT_ALIGNMENT` (0) selects the default policy
    pub alignment: Size,
}

impl AllocationRequest {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            alignment: DEFAULT_ALIGNMENT,
        }
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Request sized and aligned for one `T`
    pub fn for_type<T>() -> Self {
        Self::new(std::mem::size_of::<T>()).with_alignment(std::mem::align_of::<T>())
    }
}

/// Owning handle to a live allocation
///
/// Neither `Copy` nor `Clone`: releasing consumes the handle, so each block is
/// released at most once unless `from_raw` is used to forge a second handle.
/// Dropping a `Block` without releasing it leaks the allocation.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "a Block leaks unless it is released"]
pub struct Block {
    ptr: NonNull<u8>,
}

// A Block is the unique owner of heap memory; it carries no thread affinity
unsafe impl Send for Block {}
unsafe impl Sync for Block {}

impl Block {
    #[inline]
    pub(crate) fn from_non_null(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }

    /// Start of the usable region
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    #[inline]
    pub fn address(&self) -> Address {
        self.ptr.as_ptr() as Address
    }

    /// Give up the handle, for example to pass the block across an FFI boundary
    #[inline]
    pub fn into_raw(self) -> NonNull<u8> {
        self.ptr
    }

    /// Rebuild a handle from [`Block::into_raw`]
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` on a block of the same subsystem that
    /// has not been released, and no other handle to it may exist.
    #[inline]
    pub unsafe fn from_raw(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }
}

/// Metadata snapshot of one live block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub address: Address,
    pub requested: Size,
    pub usable: Size,
    pub alignment: Size,
}

/// Memory statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub backend: String,
    pub heap: String,
    pub allocations: u64,
    pub releases: u64,
    pub reallocations: u64,
    pub in_place_reallocations: u64,
    pub live_blocks: u64,
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub heap_checks: u64,
}

/*!
 * Native Heaps
 * Thin dispatch over the heaps that service raw block requests
 */

use crate::memory::config::HeapKind;
use crate::memory::types::{MemoryError, MemoryResult};
use std::alloc::{GlobalAlloc, Layout, System};

/// Heap chosen at construction; never changes afterwards
#[derive(Debug, Clone, Copy)]
pub(crate) enum Heap {
    System,
    #[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
    Jemalloc,
}

#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
static JEMALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

impl Heap {
    pub fn open(kind: HeapKind) -> MemoryResult<Self> {
        match kind {
            HeapKind::System => Ok(Heap::System),
            #[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
            HeapKind::Jemalloc => Ok(Heap::Jemalloc),
            #[cfg(not(all(feature = "jemalloc", not(target_env = "msvc"))))]
            HeapKind::Jemalloc => Err(MemoryError::InvalidConfig(
                "jemalloc heap requested but the 'jemalloc' feature is disabled".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> HeapKind {
        match self {
            Heap::System => HeapKind::System,
            #[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
            Heap::Jemalloc => HeapKind::Jemalloc,
        }
    }

    /// # Safety
    /// `layout` must have a non-zero size.
    #[inline]
    pub unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match self {
            Heap::System => System.alloc(layout),
            #[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
            Heap::Jemalloc => JEMALLOC.alloc(layout),
        }
    }

    /// # Safety
    /// `layout` must have a non-zero size.
    #[inline]
    pub unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        match self {
            Heap::System => System.alloc_zeroed(layout),
            #[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
            Heap::Jemalloc => JEMALLOC.alloc_zeroed(layout),
        }
    }

    /// # Safety
    /// `ptr` must come from this heap with exactly `layout`.
    #[inline]
    pub unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        match self {
            Heap::System => System.dealloc(ptr, layout),
            #[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
            Heap::Jemalloc => JEMALLOC.dealloc(ptr, layout),
        }
    }
}

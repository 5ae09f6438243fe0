/*!
 * Memory Subsystem
 *
 * Alignment-aware allocator that every other component uses for its dynamic
 * memory.
 *
 * ## Block Layout
 *
 * Each block is one native-heap region carrying an inline header:
 * - **Header**: requested size, usable size, alignment and a state magic,
 *   stored just below the user pointer so size queries never take a lock
 * - **Usable region**: quantized through the size-class table, so callers
 *   can predict the real cost of a request with `quantize_size`
 * - **Tail canary**: 16 bytes of `0xFD` in checked configurations
 *
 * ## Checked Configurations
 *
 * - New blocks are junk-filled, released blocks are poisoned
 * - Header magic and canary are verified on release, reallocate and heap walks
 * - Released blocks sit in a bounded quarantine before going back to the
 *   heap; their poison is re-checked on eviction and on heap walks
 * - An optional sharded registry catches double release without touching
 *   freed memory
 *
 * ## Thread Safety
 *
 * The subsystem is `Send + Sync`. Shared state is limited to atomic counters
 * and the sharded registry; per-block exclusivity comes from [`Block`] being
 * a unique, non-`Clone` handle.
 */

mod allocator;
mod guard_ext;
mod header;
mod heap;
mod policy;
mod quarantine;
mod registry;
mod tracking;

pub use guard_ext::MemoryGuardExt;
pub use policy::{AlignmentPolicy, SizeClassTable};

use crate::memory::backend::{self, MemoryBackend, PlatformBackend};
use crate::memory::config::MemoryConfig;
use crate::memory::types::{Block, MemoryResult, MemoryStats};
use heap::Heap;
use quarantine::Quarantine;
use registry::BlockRegistry;
use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use tracing::{error, info};
use tracking::Counters;

/// Memory subsystem
///
/// `B` is the byte-operation backend, fixed for the build target by default.
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of atomic counters
#[repr(C, align(64))]
pub struct MemorySubsystem<B: MemoryBackend = PlatformBackend> {
    counters: Counters,
    config: MemoryConfig,
    heap: Heap,
    // Present when `track_blocks` is on
    registry: Option<BlockRegistry>,
    // Present when `checks` is on
    quarantine: Option<Quarantine>,
    _backend: PhantomData<fn() -> B>,
}

impl MemorySubsystem<PlatformBackend> {
    /// Subsystem over the platform backend
    pub fn new(config: MemoryConfig) -> MemoryResult<Self> {
        Self::with_backend(config)
    }
}

impl<B: MemoryBackend> MemorySubsystem<B> {
    /// Subsystem over an explicit backend
    pub fn with_backend(config: MemoryConfig) -> MemoryResult<Self> {
        config.validate()?;
        let heap = Heap::open(config.heap)?;
        let caps = backend::init_backend();

        info!(
            backend = B::NAME,
            heap = %config.heap,
            checks = config.checks,
            track_blocks = config.track_blocks,
            max_vector_bytes = caps.max_vector_bytes(),
            "Memory subsystem initialized"
        );

        let registry = config.track_blocks.then(BlockRegistry::new);
        let quarantine = config.checks.then(Quarantine::new);
        Ok(Self {
            counters: Counters::new(),
            config,
            heap,
            registry,
            quarantine,
            _backend: PhantomData,
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        B::NAME
    }

    /// Whether canaries and poisoning are active
    #[inline]
    pub fn checks_enabled(&self) -> bool {
        self.config.checks
    }

    /// Whether live blocks are recorded in the registry
    #[inline]
    pub fn tracking_enabled(&self) -> bool {
        self.registry.is_some()
    }

    pub fn stats(&self) -> MemoryStats {
        let snap = self.counters.snapshot();
        MemoryStats {
            backend: B::NAME.to_string(),
            heap: self.heap.kind().to_string(),
            allocations: snap.allocations,
            releases: snap.releases,
            reallocations: snap.reallocations,
            in_place_reallocations: snap.in_place_reallocations,
            live_blocks: snap.live_blocks(),
            live_bytes: snap.live_bytes,
            peak_bytes: snap.peak_bytes,
            heap_checks: snap.heap_checks,
        }
    }

    /// Released blocks not yet returned to the native heap
    pub fn quarantined(&self) -> usize {
        self.quarantine.as_ref().map_or(0, Quarantine::len)
    }

    /// Raw memory straight from the configured heap
    ///
    /// Bypasses headers, checks, counters and the registry. Returns `None`
    /// when the heap is exhausted or `layout` has zero size.
    pub fn system_alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        NonNull::new(unsafe { self.heap.alloc(layout) })
    }

    /// Return memory obtained from [`system_alloc`](Self::system_alloc)
    ///
    /// # Safety
    /// `ptr` must come from `system_alloc` on this subsystem with exactly
    /// `layout`, and must not be used afterwards.
    pub unsafe fn system_free(&self, ptr: NonNull<u8>, layout: Layout) {
        self.heap.dealloc(ptr.as_ptr(), layout);
    }

    /// Release a block if there is one
    #[inline]
    pub fn release_opt(&self, block: Option<Block>) {
        if let Some(block) = block {
            self.release(block);
        }
    }
}

impl<B: MemoryBackend> Drop for MemorySubsystem<B> {
    fn drop(&mut self) {
        let quarantine = match &self.quarantine {
            Some(quarantine) => quarantine,
            None => return,
        };
        // No panics from drop: damage found here is only logged
        for parked in quarantine.drain() {
            if let Err(err) = self.check_released(&parked) {
                error!(error = %err, "Quarantined block damaged at teardown");
            }
            unsafe { self.heap.dealloc(parked.raw as *mut u8, parked.layout) };
        }
    }
}

impl<B: MemoryBackend> fmt::Debug for MemorySubsystem<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySubsystem")
            .field("backend", &B::NAME)
            .field("config", &self.config)
            .field("live_blocks", &self.counters.snapshot().live_blocks())
            .field("quarantined", &self.quarantined())
            .finish()
    }
}

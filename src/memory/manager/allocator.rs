/*!
 * Memory Allocator Implementation
 * Allocation, reallocation and release logic
 */

use super::header::{self, BlockLayout, BlockState};
use super::policy::{AlignmentPolicy, SizeClassTable};
use super::quarantine::QuarantinedBlock;
use super::MemorySubsystem;
use crate::core::limits::{JUNK_BYTE, POISON_BYTE};
use crate::core::types::Size;
use crate::memory::backend::MemoryBackend;
use crate::memory::types::{AllocationRequest, Block, BlockInfo, MemoryError, MemoryResult};
use std::alloc::Layout;
use std::ptr::NonNull;
use tracing::{debug, error, trace};

impl<B: MemoryBackend> MemorySubsystem<B> {
    /// Usable size `allocate(size, alignment)` would produce
    ///
    /// # Panics
    /// If `alignment` is neither `DEFAULT_ALIGNMENT` nor a power of two.
    pub fn quantize_size(&self, size: Size, alignment: usize) -> Size {
        match SizeClassTable::quantize(size, alignment) {
            Ok(usable) => usable,
            Err(err) => Self::misuse(err),
        }
    }

    /// Allocate a block of at least `size` bytes
    ///
    /// Exhaustion terminates the process through `handle_alloc_error`.
    ///
    /// # Panics
    /// If `alignment` is neither `DEFAULT_ALIGNMENT` nor a power of two.
    pub fn allocate(&self, size: Size, alignment: usize) -> Block {
        match self.allocate_block(size, alignment, false) {
            Ok(block) => block,
            Err(err) => Self::fatal(err),
        }
    }

    /// Allocate a block whose usable region is zeroed
    pub fn allocate_zeroed(&self, size: Size, alignment: usize) -> Block {
        match self.allocate_block(size, alignment, true) {
            Ok(block) => block,
            Err(err) => Self::fatal(err),
        }
    }

    /// Fallible twin of [`allocate`](Self::allocate)
    pub fn try_allocate(&self, request: AllocationRequest) -> MemoryResult<Block> {
        self.allocate_block(request.size, request.alignment, false)
    }

    /// Resize a block, moving it if it cannot grow in place
    ///
    /// - `None` allocates
    /// - `new_size == 0` releases and returns `None`
    /// - a move copies `min(old usable, new_size)` bytes; anything past the
    ///   old usable size is uninitialized
    pub fn reallocate(&self, block: Option<Block>, new_size: Size, alignment: usize) -> Option<Block> {
        let block = match block {
            Some(block) => block,
            None => return Some(self.allocate(new_size, alignment)),
        };

        if new_size == 0 {
            self.release(block);
            return None;
        }

        let user = block.as_non_null();
        let old = self.checked_header(user, "reallocate");

        let resolved = match AlignmentPolicy::resolve(new_size, alignment) {
            Ok(resolved) => resolved,
            Err(err) => Self::misuse(err),
        };
        let quantized = match SizeClassTable::quantize_resolved(new_size, resolved) {
            Some(quantized) => quantized,
            None => Self::misuse(MemoryError::SizeOverflow {
                requested: new_size,
                alignment: resolved,
            }),
        };

        if resolved == old.alignment as usize && quantized <= old.usable {
            unsafe { header::set_requested(user, new_size) };
            if let Some(registry) = &self.registry {
                registry.update_requested(block.address(), new_size);
            }
            self.counters.record_reallocation(true);
            trace!(
                address = block.address(),
                old_requested = old.requested,
                new_size,
                usable = old.usable,
                "Reallocated in place"
            );
            return Some(block);
        }

        let moved = match self.allocate_block(new_size, resolved, false) {
            Ok(moved) => moved,
            Err(err) => Self::fatal(err),
        };
        let count = old.usable.min(new_size);
        // Distinct live blocks never overlap, but the contract is the overlap-safe move
        unsafe { B::move_bytes(moved.as_ptr(), user.as_ptr(), count) };

        trace!(
            from = block.address(),
            to = moved.address(),
            copied = count,
            "Reallocated by move"
        );

        self.release(block);
        self.counters.record_reallocation(false);
        Some(moved)
    }

    /// Return a block to its heap
    ///
    /// In checked configurations the block is poisoned and quarantined first,
    /// and a double release or a damaged block is fatal.
    pub fn release(&self, block: Block) {
        let user = block.into_raw();
        let address = user.as_ptr() as usize;

        // Registry first: a stale handle is caught without reading freed memory
        if let Some(registry) = &self.registry {
            if registry.remove(address).is_none() {
                Self::misuse(MemoryError::DoubleRelease(address));
            }
        }

        let header = self.checked_header(user, "release");
        let layout = BlockLayout::from_header(&header, self.config.checks);
        let raw = unsafe { header::raw_base(user, &header) };
        self.counters.record_release(header.usable);

        if let Some(quarantine) = &self.quarantine {
            unsafe {
                B::fill(user.as_ptr(), POISON_BYTE, header.usable);
                header::mark_freed(user);
            }
            let evicted = quarantine.admit(QuarantinedBlock {
                address,
                usable: header.usable,
                raw: raw as usize,
                layout: layout.raw,
            });
            trace!(address, usable = header.usable, "Released block to quarantine");

            for parked in evicted {
                if let Err(err) = self.check_released(&parked) {
                    Self::misuse(err);
                }
                unsafe { self.heap.dealloc(parked.raw as *mut u8, parked.layout) };
            }
        } else {
            unsafe { self.heap.dealloc(raw, layout.raw) };
            trace!(address, usable = header.usable, "Released block");
        }
    }

    /// Usable size recorded when the block was allocated
    #[inline]
    pub fn query_size(&self, block: &Block) -> Size {
        if self.config.checks {
            self.checked_header(block.as_non_null(), "query_size").usable
        } else {
            unsafe { header::read_header(block.as_non_null()).usable }
        }
    }

    /// Metadata snapshot for a live block
    pub fn block_info(&self, block: &Block) -> BlockInfo {
        let header = unsafe { header::read_header(block.as_non_null()) };
        BlockInfo {
            address: block.address(),
            requested: header.requested,
            usable: header.usable,
            alignment: header.alignment as usize,
        }
    }

    /// Check one block's header and canary without treating damage as fatal
    pub fn check_block(&self, block: &Block) -> MemoryResult<BlockInfo> {
        self.check_raw(block.as_non_null()).map(|_| self.block_info(block))
    }

    /// Walk every registered block and every quarantined block and verify them
    ///
    /// Returns the number of live blocks checked. Corruption, including a
    /// write into a released block still in quarantine, is fatal. Without a
    /// registry no live blocks are walked and the result is zero.
    pub fn verify_heap(&self) -> usize {
        if let Some(quarantine) = &self.quarantine {
            let mut parked_checked = 0;
            quarantine.for_each(|parked| {
                if let Err(err) = self.check_released(parked) {
                    Self::misuse(err);
                }
                parked_checked += 1;
            });
            debug!(blocks = parked_checked, "Quarantine walk complete");
        }

        let registry = match &self.registry {
            Some(registry) => registry,
            None => {
                debug!("Heap walk skipped: block tracking disabled");
                return 0;
            }
        };

        let mut checked = 0;
        registry.for_each(|info| {
            // Entries are removed before their memory is freed
            let user = match NonNull::new(info.address as *mut u8) {
                Some(user) => user,
                None => return,
            };
            if let Err(err) = self.check_raw(user) {
                Self::misuse(err);
            }
            checked += 1;
        });

        debug!(blocks = checked, "Heap walk complete");
        checked
    }

    /// Snapshot of every registered block, sorted by address
    pub fn live_blocks(&self) -> Vec<BlockInfo> {
        self.registry
            .as_ref()
            .map(|registry| registry.snapshot())
            .unwrap_or_default()
    }

    fn allocate_block(&self, size: Size, alignment: usize, zeroed: bool) -> MemoryResult<Block> {
        let resolved = AlignmentPolicy::resolve(size, alignment)?;
        let overflow = MemoryError::SizeOverflow {
            requested: size,
            alignment: resolved,
        };
        let usable = SizeClassTable::quantize_resolved(size, resolved).ok_or_else(|| overflow.clone())?;
        let layout = BlockLayout::new(usable, resolved, self.config.checks).ok_or(overflow)?;

        let raw = unsafe {
            if zeroed {
                self.heap.alloc_zeroed(layout.raw)
            } else {
                self.heap.alloc(layout.raw)
            }
        };
        let raw = NonNull::new(raw).ok_or(MemoryError::OutOfMemory {
            requested: size,
            alignment: resolved,
        })?;

        let user = unsafe { header::init_block(raw, &layout, size) };
        if self.config.checks {
            unsafe {
                if !zeroed {
                    B::fill(user.as_ptr(), JUNK_BYTE, usable);
                }
                header::write_canary::<B>(user, usable);
            }
        }

        let block = Block::from_non_null(user);
        if let Some(registry) = &self.registry {
            registry.insert(BlockInfo {
                address: block.address(),
                requested: size,
                usable,
                alignment: resolved,
            });
        }

        self.counters.record_allocation(usable);
        trace!(
            address = block.address(),
            size,
            usable,
            alignment = resolved,
            "Allocated block"
        );
        Ok(block)
    }

    fn check_raw(&self, user: NonNull<u8>) -> MemoryResult<()> {
        let address = user.as_ptr() as usize;
        let state = unsafe { header::inspect(user, self.config.checks) };
        if self.config.checks {
            self.counters.record_heap_check();
        }
        Self::state_result(address, state)
    }

    /// Verify a quarantined block is exactly as `release` left it
    pub(super) fn check_released(&self, parked: &QuarantinedBlock) -> MemoryResult<()> {
        let user = match NonNull::new(parked.address as *mut u8) {
            Some(user) => user,
            None => return Ok(()),
        };
        self.counters.record_heap_check();
        match unsafe { header::inspect_released(user, parked.usable) } {
            BlockState::Freed => Ok(()),
            BlockState::HeaderCorrupt => Err(MemoryError::CorruptionDetected {
                address: parked.address,
                reason: "released block header overwritten".to_string(),
            }),
            state => Self::state_result(parked.address, state),
        }
    }

    fn state_result(address: usize, state: BlockState) -> MemoryResult<()> {
        match state {
            BlockState::Intact => Ok(()),
            BlockState::Freed => Err(MemoryError::DoubleRelease(address)),
            BlockState::HeaderCorrupt => Err(MemoryError::CorruptionDetected {
                address,
                reason: "block header overwritten".to_string(),
            }),
            BlockState::CanaryCorrupt(offset) => Err(MemoryError::CorruptionDetected {
                address,
                reason: format!("tail canary overwritten {} bytes past the usable region", offset),
            }),
            BlockState::PoisonCorrupt(offset) => Err(MemoryError::CorruptionDetected {
                address,
                reason: format!("released block written after release at offset {}", offset),
            }),
        }
    }

    fn checked_header(&self, user: NonNull<u8>, operation: &'static str) -> header::BlockHeader {
        if let Err(err) = self.check_raw(user) {
            error!(operation, "Block check failed");
            Self::misuse(err);
        }
        unsafe { header::read_header(user) }
    }

    /// Exhaustion: terminate through the standard allocation error hook
    #[cold]
    fn fatal(err: MemoryError) -> ! {
        match err {
            MemoryError::OutOfMemory {
                requested,
                alignment,
            } => {
                error!(requested, alignment, "Allocation failed: native heap exhausted");
                let layout = Layout::from_size_align(requested.max(1), alignment)
                    .unwrap_or_else(|_| Layout::new::<u8>());
                std::alloc::handle_alloc_error(layout)
            }
            other => Self::misuse(other),
        }
    }

    /// Caller error or heap damage: log and panic
    #[cold]
    fn misuse(err: MemoryError) -> ! {
        error!(error = %err, corruption = err.is_corruption(), "Fatal memory error");
        panic!("{}", err)
    }
}

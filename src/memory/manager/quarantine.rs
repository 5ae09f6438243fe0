/*!
 * Release Quarantine
 *
 * In checked configurations a released block is poisoned and parked here
 * instead of going straight back to the native heap. The memory stays owned
 * by the subsystem, so writes through a stale handle land in poisoned bytes
 * that are checked again when the block is evicted and on every heap walk.
 */

use crate::core::limits::{QUARANTINE_BLOCKS, QUARANTINE_BYTES};
use crate::core::types::{Address, Size};
use parking_lot::Mutex;
use std::alloc::Layout;
use std::collections::VecDeque;

/// One released block awaiting return to the heap
#[derive(Debug, Clone, Copy)]
pub(super) struct QuarantinedBlock {
    pub address: Address,
    pub usable: Size,
    /// Raw heap pointer and layout, recorded at release so eviction does not
    /// depend on a header a stale write may have damaged
    pub raw: Address,
    pub layout: Layout,
}

#[derive(Debug, Default)]
struct Parked {
    blocks: VecDeque<QuarantinedBlock>,
    bytes: Size,
}

/// FIFO of released blocks bounded by count and bytes
#[derive(Debug)]
pub(super) struct Quarantine {
    parked: Mutex<Parked>,
    max_blocks: usize,
    max_bytes: Size,
}

impl Quarantine {
    pub fn new() -> Self {
        Self::with_limits(QUARANTINE_BLOCKS, QUARANTINE_BYTES)
    }

    pub fn with_limits(max_blocks: usize, max_bytes: Size) -> Self {
        Self {
            parked: Mutex::new(Parked::default()),
            max_blocks,
            max_bytes,
        }
    }

    /// Park a block and hand back whatever the caps push out, oldest first
    pub fn admit(&self, block: QuarantinedBlock) -> Vec<QuarantinedBlock> {
        let mut parked = self.parked.lock();
        parked.bytes += block.usable;
        parked.blocks.push_back(block);

        let mut evicted = Vec::new();
        while parked.blocks.len() > self.max_blocks || parked.bytes > self.max_bytes {
            match parked.blocks.pop_front() {
                Some(oldest) => {
                    parked.bytes -= oldest.usable;
                    evicted.push(oldest);
                }
                None => break,
            }
        }
        evicted
    }

    /// Visit every parked block while holding the lock
    ///
    /// Nothing is evicted during the walk, so each block stays mapped for the
    /// duration of the callback.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&QuarantinedBlock),
    {
        let parked = self.parked.lock();
        for block in &parked.blocks {
            f(block);
        }
    }

    /// Remove every parked block
    pub fn drain(&self) -> Vec<QuarantinedBlock> {
        let mut parked = self.parked.lock();
        parked.bytes = 0;
        parked.blocks.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.parked.lock().blocks.len()
    }
}

/*!
 * Live Block Registry
 *
 * Optional sharded map of every live block, keyed by user address. Used for
 * double-release detection and heap walks in checked configurations.
 */

use crate::core::types::Address;
use crate::memory::types::BlockInfo;
use ahash::RandomState;
use dashmap::DashMap;

pub(super) struct BlockRegistry {
    blocks: DashMap<Address, BlockInfo, RandomState>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: DashMap::with_hasher(RandomState::new()),
        }
    }

    #[inline]
    pub fn insert(&self, info: BlockInfo) {
        self.blocks.insert(info.address, info);
    }

    /// Remove a block; `None` means it was never live or is already released
    #[inline]
    pub fn remove(&self, address: Address) -> Option<BlockInfo> {
        self.blocks.remove(&address).map(|(_, info)| info)
    }

    #[inline]
    pub fn contains(&self, address: Address) -> bool {
        self.blocks.contains_key(&address)
    }

    /// Record a new requested size for a block resized in place
    pub fn update_requested(&self, address: Address, requested: usize) {
        if let Some(mut entry) = self.blocks.get_mut(&address) {
            entry.requested = requested;
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Visit every live block while holding each shard's read lock
    ///
    /// Release removes the entry before freeing memory, so a block visited
    /// here stays mapped for the duration of the callback.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&BlockInfo),
    {
        for entry in self.blocks.iter() {
            f(entry.value());
        }
    }

    pub fn snapshot(&self) -> Vec<BlockInfo> {
        let mut blocks: Vec<BlockInfo> = self.blocks.iter().map(|e| *e.value()).collect();
        blocks.sort_unstable_by_key(|info| info.address);
        blocks
    }
}

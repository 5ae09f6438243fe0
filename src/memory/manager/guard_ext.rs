/*!
 * Memory Guard Extensions
 *
 * Extension trait to create RAII guards and managed values
 */

use super::MemorySubsystem;
use crate::core::guard::{ControlledConstruction, GuardResult, Managed, MemoryGuard};
use crate::core::types::Size;
use crate::memory::backend::MemoryBackend;
use crate::memory::types::AllocationRequest;

/// Extension trait for creating guards
pub trait MemoryGuardExt<B: MemoryBackend> {
    /// Allocate a zeroed block with an RAII guard for automatic release
    ///
    /// # Example
    ///
    /// ```rust
    /// use st_memory::memory::manager::MemoryGuardExt;
    /// use st_memory::memory::{MemoryConfig, MemorySubsystem};
    ///
    /// let memory = MemorySubsystem::new(MemoryConfig::default())?;
    /// let guard = memory.allocate_guard(1024, 0);
    /// assert_eq!(guard.as_slice().len(), 1024);
    /// // Block released on drop
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn allocate_guard(&self, size: Size, alignment: usize) -> MemoryGuard<'_, B>;

    /// Fallible twin of `allocate_guard`; the block is not zeroed
    fn try_allocate_guard(&self, request: AllocationRequest) -> GuardResult<MemoryGuard<'_, B>>;

    /// Construct `value` in subsystem storage
    fn construct<T: ControlledConstruction>(&self, value: T) -> Managed<'_, T, B>;
}

impl<B: MemoryBackend> MemoryGuardExt<B> for MemorySubsystem<B> {
    fn allocate_guard(&self, size: Size, alignment: usize) -> MemoryGuard<'_, B> {
        let block = self.allocate_zeroed(size, alignment);
        MemoryGuard::new(self, block, size)
    }

    fn try_allocate_guard(&self, request: AllocationRequest) -> GuardResult<MemoryGuard<'_, B>> {
        let block = self.try_allocate(request)?;
        Ok(MemoryGuard::new(self, block, request.size))
    }

    fn construct<T: ControlledConstruction>(&self, value: T) -> Managed<'_, T, B> {
        Managed::new(self, value)
    }
}

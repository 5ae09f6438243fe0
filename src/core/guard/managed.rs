/*!
 * Managed Values
 *
 * Values of opted-in types live in subsystem storage for their whole life.
 * The only way to create one is the factory, and the handle cannot be cloned,
 * so a managed value is never duplicated or overwritten bytewise.
 */

use crate::memory::backend::{MemoryBackend, PlatformBackend};
use crate::memory::manager::MemorySubsystem;
use crate::memory::types::Block;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, align_of, size_of};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

/// Marker for types constructed and destroyed through the memory subsystem
///
/// Implementing it has no other effect on the type; it only admits the type
/// to [`Managed`].
pub trait ControlledConstruction: Sized {}

/// Owning handle to one `T` stored in a subsystem block
///
/// Not `Clone`: two handles never refer to the same value. Dropping runs `T`'s
/// destructor and then releases the storage.
pub struct Managed<'a, T: ControlledConstruction, B: MemoryBackend = PlatformBackend> {
    ptr: NonNull<T>,
    // Taken by `into_inner`
    block: Option<Block>,
    memory: &'a MemorySubsystem<B>,
    _owns: PhantomData<T>,
}

// Same rules as Box<T>: the handle owns its T
unsafe impl<T: ControlledConstruction + Send, B: MemoryBackend> Send for Managed<'_, T, B> {}
unsafe impl<T: ControlledConstruction + Sync, B: MemoryBackend> Sync for Managed<'_, T, B> {}

impl<'a, T: ControlledConstruction, B: MemoryBackend> Managed<'a, T, B> {
    /// Move `value` into storage from `memory`
    pub fn new(memory: &'a MemorySubsystem<B>, value: T) -> Self {
        // Zero-sized types still get a real, aligned block
        let block = memory.allocate(size_of::<T>(), align_of::<T>());
        let ptr = block.as_non_null().cast::<T>();
        unsafe { ptr.as_ptr().write(value) };

        Self {
            ptr,
            block: Some(block),
            memory,
            _owns: PhantomData,
        }
    }

    /// Move the value out and release its storage
    pub fn into_inner(mut self) -> T {
        let value = unsafe { ptr::read(self.ptr.as_ptr()) };
        let block = self.block.take();
        let memory = self.memory;
        // The value now lives in `value`; skip the destructor in Drop
        mem::forget(self);
        memory.release_opt(block);
        value
    }

    /// Address of the storage block
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

impl<T: ControlledConstruction, B: MemoryBackend> Deref for Managed<'_, T, B> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ControlledConstruction, B: MemoryBackend> DerefMut for Managed<'_, T, B> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: ControlledConstruction + fmt::Debug, B: MemoryBackend> fmt::Debug for Managed<'_, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Managed").field(&**self).finish()
    }
}

impl<T: ControlledConstruction, B: MemoryBackend> Drop for Managed<'_, T, B> {
    fn drop(&mut self) {
        unsafe { ptr::drop_in_place(self.ptr.as_ptr()) };
        self.memory.release_opt(self.block.take());
    }
}

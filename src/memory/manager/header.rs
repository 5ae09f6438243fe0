/*!
 * Block Header
 *
 * Per-block metadata stored immediately before the usable region:
 *
 * ```text
 * raw base                       user pointer (aligned)
 * |<-- padding -->|<- header ->|<---- usable ---->|<- tail canary ->|
 * ```
 *
 * Keeping the metadata inline makes size queries lock-free; the only shared
 * state touched per operation is a handful of atomic counters.
 */

use crate::core::limits::{CANARY_BYTE, FREED_MAGIC, LIVE_MAGIC, POISON_BYTE, TAIL_CANARY_LEN};
use crate::memory::backend::MemoryBackend;
use std::alloc::Layout;
use std::mem::{align_of, size_of};
use std::ptr::{addr_of, NonNull};

/// Inline bookkeeping for one block
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockHeader {
    pub requested: usize,
    pub usable: usize,
    pub alignment: u32,
    /// Distance from the raw heap pointer to the user pointer
    pub offset: u32,
    pub magic: u64,
}

pub(crate) const HEADER_SIZE: usize = size_of::<BlockHeader>();

const _: () = assert!(HEADER_SIZE % align_of::<BlockHeader>() == 0);
const _: () = assert!(align_of::<BlockHeader>() <= crate::core::limits::MIN_ALIGNMENT);

/// Raw heap shape for one block
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockLayout {
    /// Layout passed to the native heap
    pub raw: Layout,
    /// Bytes from the raw base to the user pointer
    pub offset: usize,
    pub usable: usize,
    pub alignment: usize,
    pub tail: usize,
}

impl BlockLayout {
    /// Compute the raw layout for `usable` bytes at `alignment`
    ///
    /// `alignment` is already resolved: a power of two, at least `MIN_ALIGNMENT`.
    pub fn new(usable: usize, alignment: usize, checks: bool) -> Option<Self> {
        // The header sits just below the user pointer, so the prefix is the
        // header rounded up to the block alignment
        let offset = HEADER_SIZE.checked_add(alignment - 1)? & !(alignment - 1);
        if offset > u32::MAX as usize || alignment > u32::MAX as usize {
            return None;
        }

        let tail = if checks { TAIL_CANARY_LEN } else { 0 };
        let total = offset.checked_add(usable)?.checked_add(tail)?;
        let raw = Layout::from_size_align(total, alignment).ok()?;

        Some(Self {
            raw,
            offset,
            usable,
            alignment,
            tail,
        })
    }

    /// Rebuild the layout recorded in a header
    pub fn from_header(header: &BlockHeader, checks: bool) -> Self {
        let tail = if checks { TAIL_CANARY_LEN } else { 0 };
        let alignment = header.alignment as usize;
        let offset = header.offset as usize;
        let total = offset + header.usable + tail;
        // Validated when the block was created
        let raw = unsafe { Layout::from_size_align_unchecked(total, alignment) };
        Self {
            raw,
            offset,
            usable: header.usable,
            alignment,
            tail,
        }
    }
}

/// Pointer to the header of the block whose user pointer is `user`
#[inline]
pub(crate) fn header_ptr(user: NonNull<u8>) -> *mut BlockHeader {
    // Offset is at least HEADER_SIZE and a multiple of MIN_ALIGNMENT
    unsafe { user.as_ptr().sub(HEADER_SIZE) as *mut BlockHeader }
}

/// Read the header of a live block
///
/// # Safety
/// `user` must be the user pointer of a block produced by this module.
#[inline]
pub(crate) unsafe fn read_header(user: NonNull<u8>) -> BlockHeader {
    header_ptr(user).read()
}

/// Write a live header and return the user pointer
///
/// # Safety
/// `raw` must point at a fresh allocation with layout `layout.raw`.
pub(crate) unsafe fn init_block(raw: NonNull<u8>, layout: &BlockLayout, requested: usize) -> NonNull<u8> {
    let user = NonNull::new_unchecked(raw.as_ptr().add(layout.offset));
    header_ptr(user).write(BlockHeader {
        requested,
        usable: layout.usable,
        alignment: layout.alignment as u32,
        offset: layout.offset as u32,
        magic: LIVE_MAGIC,
    });
    user
}

/// Update the requested size of a block resized in place
///
/// # Safety
/// `user` must be a live block owned by the caller.
#[inline]
pub(crate) unsafe fn set_requested(user: NonNull<u8>, requested: usize) {
    (*header_ptr(user)).requested = requested;
}

/// Mark a block released
///
/// # Safety
/// `user` must be a live block owned by the caller.
#[inline]
pub(crate) unsafe fn mark_freed(user: NonNull<u8>) {
    (*header_ptr(user)).magic = FREED_MAGIC;
}

/// Raw heap pointer for a block
///
/// # Safety
/// `header` must be the header read from `user`.
#[inline]
pub(crate) unsafe fn raw_base(user: NonNull<u8>, header: &BlockHeader) -> *mut u8 {
    user.as_ptr().sub(header.offset as usize)
}

/// Write the tail canary after the usable region
///
/// # Safety
/// The block must have been laid out with a tail.
#[inline]
pub(crate) unsafe fn write_canary<B: MemoryBackend>(user: NonNull<u8>, usable: usize) {
    B::fill(user.as_ptr().add(usable), CANARY_BYTE, TAIL_CANARY_LEN);
}

/// What a header/canary check found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockState {
    Intact,
    Freed,
    HeaderCorrupt,
    /// Offset of the first damaged canary byte past the usable region
    CanaryCorrupt(usize),
    /// Offset of the first byte of a released block that lost its poison
    PoisonCorrupt(usize),
}

/// Check header magic and, when `checks` is on, the tail canary
///
/// Reads fields one at a time and never `requested`, which the owner may
/// rewrite while another thread walks the heap.
///
/// # Safety
/// `user` must point at memory laid out by this module.
pub(crate) unsafe fn inspect(user: NonNull<u8>, checks: bool) -> BlockState {
    let header = header_ptr(user);

    match addr_of!((*header).magic).read() {
        LIVE_MAGIC => {}
        FREED_MAGIC => return BlockState::Freed,
        _ => return BlockState::HeaderCorrupt,
    }

    let offset = addr_of!((*header).offset).read() as usize;
    let alignment = addr_of!((*header).alignment).read() as usize;
    if offset < HEADER_SIZE || !alignment.is_power_of_two() {
        return BlockState::HeaderCorrupt;
    }

    if checks {
        let usable = addr_of!((*header).usable).read();
        if let Some(i) = first_mismatch(user.as_ptr().add(usable), CANARY_BYTE, TAIL_CANARY_LEN) {
            return BlockState::CanaryCorrupt(i);
        }
    }

    BlockState::Intact
}

/// Check a quarantined block: freed magic, poison fill and tail canary
///
/// `usable` comes from the quarantine record, not the header, so a smashed
/// header cannot widen the scan. `Freed` means nothing was touched.
///
/// # Safety
/// `user` must be a released block whose memory is still held.
pub(crate) unsafe fn inspect_released(user: NonNull<u8>, usable: usize) -> BlockState {
    if addr_of!((*header_ptr(user)).magic).read() != FREED_MAGIC {
        return BlockState::HeaderCorrupt;
    }
    if let Some(i) = first_mismatch(user.as_ptr(), POISON_BYTE, usable) {
        return BlockState::PoisonCorrupt(i);
    }
    if let Some(i) = first_mismatch(user.as_ptr().add(usable), CANARY_BYTE, TAIL_CANARY_LEN) {
        return BlockState::CanaryCorrupt(i);
    }
    BlockState::Freed
}

#[inline]
unsafe fn first_mismatch(ptr: *const u8, expected: u8, len: usize) -> Option<usize> {
    std::slice::from_raw_parts(ptr, len)
        .iter()
        .position(|&b| b != expected)
}

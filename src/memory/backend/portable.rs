/*!
 * Portable Backend
 * Raw byte operations built on `core::ptr`, available on every target
 */

use super::MemoryBackend;
use std::ptr;

/// Backend with no platform-specific code paths
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableBackend;

impl MemoryBackend for PortableBackend {
    const NAME: &'static str = "portable";

    #[inline]
    unsafe fn copy(dst: *mut u8, src: *const u8, len: usize) {
        ptr::copy_nonoverlapping(src, dst, len);
    }

    #[inline]
    unsafe fn move_bytes(dst: *mut u8, src: *const u8, len: usize) {
        ptr::copy(src, dst, len);
    }

    unsafe fn compare(a: *const u8, b: *const u8, len: usize) -> i32 {
        for i in 0..len {
            let (x, y) = (*a.add(i), *b.add(i));
            if x != y {
                return x as i32 - y as i32;
            }
        }
        0
    }

    #[inline]
    unsafe fn fill(dst: *mut u8, value: u8, len: usize) {
        ptr::write_bytes(dst, value, len);
    }

    #[inline]
    unsafe fn swap(a: *mut u8, b: *mut u8, len: usize) {
        ptr::swap_nonoverlapping(a, b, len);
    }
}

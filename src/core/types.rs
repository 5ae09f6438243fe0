/*!
 * Core Types
 * Portable, explicitly sized type names shared by every subsystem
 *
 * Resolved once per build target. Each alias is checked at compile time
 * against the bit width its name promises, so a wrong table entry fails the
 * build instead of corrupting data at runtime.
 */

use std::mem::size_of;

// Unsigned base types
pub type Uint8 = u8;
pub type Uint16 = u16;
pub type Uint32 = u32;
pub type Uint64 = u64;

// Signed base types
pub type Int8 = i8;
pub type Int16 = i16;
pub type Int32 = i32;
pub type Int64 = i64;

/// An ANSI character (8-bit code unit)
pub type AnsiChar = u8;

/// Platform wide character: 16-bit on Windows, 32-bit elsewhere
#[cfg(windows)]
pub type WideChar = u16;
#[cfg(not(windows))]
pub type WideChar = u32;

/// Engine text character
pub type TChar = WideChar;

/// UTF-8 code unit
pub type Utf8Char = u8;
/// UCS-2 code unit
pub type Ucs2Char = u16;
/// UTF-16 code unit
pub type Utf16Char = u16;
/// UTF-32 code unit
pub type Utf32Char = u32;

/// Unsigned integer the same size as a pointer
pub type UPtrInt = usize;
/// Signed integer the same size as a pointer
pub type PtrInt = isize;
/// Unsigned size type, the same width as `UPtrInt`
pub type SizeT = usize;

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

const POINTER_BYTES: usize = size_of::<*const ()>();

const _: () = {
    assert!(size_of::<Uint8>() == 1);
    assert!(size_of::<Uint16>() == 2);
    assert!(size_of::<Uint32>() == 4);
    assert!(size_of::<Uint64>() == 8);
    assert!(size_of::<Int8>() == 1);
    assert!(size_of::<Int16>() == 2);
    assert!(size_of::<Int32>() == 4);
    assert!(size_of::<Int64>() == 8);
    assert!(size_of::<AnsiChar>() == 1);
    assert!(size_of::<Utf8Char>() == 1);
    assert!(size_of::<Ucs2Char>() == 2);
    assert!(size_of::<Utf16Char>() == 2);
    assert!(size_of::<Utf32Char>() == 4);
    assert!(size_of::<WideChar>() == 2 || size_of::<WideChar>() == 4);
    assert!(size_of::<UPtrInt>() == POINTER_BYTES);
    assert!(size_of::<PtrInt>() == POINTER_BYTES);
    assert!(size_of::<SizeT>() == POINTER_BYTES);
    assert!(size_of::<Address>() == POINTER_BYTES);
};

/// Whether the build target uses 64-bit pointers
pub const PLATFORM_64BITS: bool = POINTER_BYTES == 8;

/*!
 * Backend Equivalence Tests
 * Every backend must agree with the portable reference implementation
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use st_memory::memory::backend::{
    compare_slices, copy_slice, init_backend, move_within, CopyTier, MemoryBackend,
    PlatformBackend, PortableBackend, SimdBackend,
};
use std::cmp::Ordering;

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn copy_with<B: MemoryBackend>(src: &[u8]) -> Vec<u8> {
    let mut dst = vec![0u8; src.len()];
    unsafe { B::copy(dst.as_mut_ptr(), src.as_ptr(), src.len()) };
    dst
}

#[test]
fn test_backend_names() {
    init_backend();
    assert_eq!(PortableBackend::NAME, "portable");
    assert_eq!(SimdBackend::NAME, "simd");
    assert!(!PlatformBackend::NAME.is_empty());
}

#[test]
fn test_copy_tiers_produce_identical_bytes() {
    for len in [0usize, 1, 63, 64, 65, 4095, 4096, 300 * 1024, (1 << 20) + 17] {
        let src = pattern(len, 5);
        for tier in [CopyTier::Standard, CopyTier::BigBlock, CopyTier::Streaming] {
            let mut dst = vec![0u8; len];
            unsafe { tier.copy::<PlatformBackend>(dst.as_mut_ptr(), src.as_ptr(), len) };
            assert_eq!(dst, src, "tier {:?} len {}", tier, len);
        }
    }
}

#[test]
fn test_streaming_copy_into_unaligned_slice() {
    let src = pattern(2 * 1024 * 1024, 9);
    let mut dst = vec![0u8; src.len() + 3];
    unsafe { SimdBackend::streaming_copy(dst.as_mut_ptr().add(3), src.as_ptr(), src.len()) };
    assert!(dst[3..] == src[..]);
    assert_eq!(&dst[..3], &[0, 0, 0]);
}

#[test]
fn test_move_within_both_directions() {
    let original = pattern(1000, 1);

    let mut forward = original.clone();
    move_within(&mut forward, 0, 100, 800);
    assert!(forward[100..900] == original[0..800]);

    let mut backward = original.clone();
    move_within(&mut backward, 100, 0, 800);
    assert!(backward[0..800] == original[100..900]);
}

#[test]
fn test_swap_large_regions() {
    let mut a = pattern(5000, 1);
    let mut b = pattern(5000, 2);
    let (a0, b0) = (a.clone(), b.clone());
    unsafe { SimdBackend::swap(a.as_mut_ptr(), b.as_mut_ptr(), a.len()) };
    assert!(a == b0);
    assert!(b == a0);
}

#[test]
fn test_zero_clears_everything() {
    let mut buf = pattern(777, 3);
    unsafe { PlatformBackend::zero(buf.as_mut_ptr(), buf.len()) };
    assert!(buf.iter().all(|&b| b == 0));
}

#[test]
fn test_copy_slice_truncates_to_shorter() {
    let src = pattern(10, 0);
    let mut dst = vec![0u8; 4];
    assert_eq!(copy_slice(&mut dst, &src), 4);
    assert_eq!(dst, src[..4].to_vec());
}

proptest! {
    #[test]
    fn prop_simd_copy_matches_portable(src in prop::collection::vec(any::<u8>(), 0..2048)) {
        prop_assert_eq!(copy_with::<SimdBackend>(&src), copy_with::<PortableBackend>(&src));
    }

    #[test]
    fn prop_compare_sign_matches_slice_ord(
        a in prop::collection::vec(any::<u8>(), 0..512),
        b in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        prop_assert_eq!(compare_slices(&a, &b), a.cmp(&b));
    }

    #[test]
    fn prop_simd_compare_agrees_with_portable(
        base in prop::collection::vec(any::<u8>(), 64..1024),
        flip in any::<prop::sample::Index>(),
        value in any::<u8>(),
    ) {
        let mut other = base.clone();
        let at = flip.index(other.len());
        other[at] = value;

        let simd = unsafe { SimdBackend::compare(base.as_ptr(), other.as_ptr(), base.len()) };
        let portable = unsafe { PortableBackend::compare(base.as_ptr(), other.as_ptr(), base.len()) };
        prop_assert_eq!(simd.signum(), portable.signum());
        prop_assert_eq!(simd.cmp(&0), base.cmp(&other));
    }

    #[test]
    fn prop_fill_sets_every_byte(len in 0usize..4096, value in any::<u8>()) {
        let mut buf = vec![!value; len];
        unsafe { SimdBackend::fill(buf.as_mut_ptr(), value, len) };
        prop_assert!(buf.iter().all(|&b| b == value));
    }
}

#[test]
fn test_compare_equal_regions() {
    let a = pattern(4096, 7);
    let b = a.clone();
    assert_eq!(compare_slices(&a, &b), Ordering::Equal);
}

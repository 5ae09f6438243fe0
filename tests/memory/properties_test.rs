/*!
 * Allocation Contract Tests
 * Size, alignment and quantization properties of the public API
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use st_memory::core::limits::DEFAULT_ALIGNMENT;
use st_memory::memory::{Allocator, MemoryConfig, MemorySubsystem, SizeClassTable};

fn subsystem() -> MemorySubsystem {
    MemorySubsystem::new(MemoryConfig::checked()).expect("checked config is always valid")
}

#[test]
fn test_usable_size_covers_request_across_range() {
    let memory = subsystem();
    let mut size = 0usize;
    while size <= 1 << 20 {
        let block = memory.allocate(size, DEFAULT_ALIGNMENT);
        assert!(
            memory.query_size(&block) >= size,
            "size {} got {}",
            size,
            memory.query_size(&block)
        );
        memory.release(block);
        size = if size < 64 { size + 1 } else { size + size / 3 + 1 };
    }
    memory.release(memory.allocate(1 << 20, DEFAULT_ALIGNMENT));
    assert_eq!(memory.stats().live_blocks, 0);
}

#[test]
fn test_explicit_alignments_honored() {
    let memory = subsystem();
    for alignment in [8usize, 16, 32, 64] {
        for size in [1usize, 7, 20, 100, 1000, 70_000] {
            let block = memory.allocate(size, alignment);
            assert_eq!(block.address() % alignment, 0, "size {} align {}", size, alignment);
            memory.release(block);
        }
    }
}

#[test]
fn test_small_alignment_promoted_not_rejected() {
    let memory = subsystem();
    for alignment in [1usize, 2, 4] {
        let block = memory.allocate(3, alignment);
        assert_eq!(block.address() % 8, 0);
        assert_eq!(memory.block_info(&block).alignment, 8);
        memory.release(block);
    }
}

#[test]
fn test_default_alignment_rule() {
    let memory = subsystem();

    let block = memory.allocate(20, DEFAULT_ALIGNMENT);
    assert_eq!(block.address() % 16, 0);
    assert_eq!(memory.block_info(&block).alignment, 16);
    memory.release(block);

    let block = memory.allocate(4, DEFAULT_ALIGNMENT);
    assert_eq!(block.address() % 8, 0);
    assert_eq!(memory.block_info(&block).alignment, 8);
    memory.release(block);
}

#[test]
fn test_reallocate_none_matches_allocate() {
    let memory = subsystem();
    for size in [0usize, 5, 20, 4000, 100_000] {
        let direct = memory.allocate(size, DEFAULT_ALIGNMENT);
        let via_realloc = memory
            .reallocate(None, size, DEFAULT_ALIGNMENT)
            .expect("reallocate(None) always allocates");

        assert_eq!(memory.query_size(&direct), memory.query_size(&via_realloc));
        assert_eq!(
            memory.block_info(&direct).alignment,
            memory.block_info(&via_realloc).alignment
        );
        memory.release(direct);
        memory.release(via_realloc);
    }
}

#[test]
fn test_quantize_predicts_allocation() {
    let memory = subsystem();
    for (size, alignment) in [(0, 0), (1, 0), (33, 0), (129, 64), (65_537, 0), (10, 4096)] {
        let block = memory.allocate(size, alignment);
        assert_eq!(memory.query_size(&block), memory.quantize_size(size, alignment));
        memory.release(block);
    }
}

#[test]
fn test_allocator_trait_object() {
    let memory = subsystem();
    let allocator: &dyn Allocator = &memory;

    let block = allocator.allocate(48, 32);
    assert_eq!(allocator.query_size(&block), allocator.quantize_size(48, 32));
    let block = allocator.reallocate(Some(block), 96, 32);
    assert!(block.is_some());
    allocator.reallocate(block, 0, 32);
    assert_eq!(memory.stats().live_blocks, 0);
}

proptest! {
    #[test]
    fn prop_quantize_idempotent(size in 0usize..(1 << 20)) {
        let q = SizeClassTable::quantize(size, DEFAULT_ALIGNMENT).unwrap();
        prop_assert_eq!(SizeClassTable::quantize(q, DEFAULT_ALIGNMENT).unwrap(), q);
    }

    #[test]
    fn prop_quantize_monotone(a in 0usize..(1 << 20), b in 0usize..(1 << 20)) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            SizeClassTable::quantize(lo, DEFAULT_ALIGNMENT).unwrap()
                <= SizeClassTable::quantize(hi, DEFAULT_ALIGNMENT).unwrap()
        );
    }

    #[test]
    fn prop_allocation_satisfies_contract(
        size in 0usize..(1 << 18),
        alignment in prop::sample::select(vec![0usize, 8, 16, 32, 64]),
    ) {
        let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
        let block = memory.allocate(size, alignment);
        prop_assert!(memory.query_size(&block) >= size);
        prop_assert_eq!(block.address() % alignment.max(8), 0);
        memory.release(block);
    }
}

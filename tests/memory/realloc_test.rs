/*!
 * Reallocation Tests
 * Prefix preservation, in-place resizing and release-through-reallocate
 */

use pretty_assertions::assert_eq;
use st_memory::core::limits::DEFAULT_ALIGNMENT;
use st_memory::memory::{Block, MemoryConfig, MemorySubsystem};

fn subsystem() -> MemorySubsystem {
    MemorySubsystem::new(MemoryConfig::checked()).expect("checked config is always valid")
}

fn write_pattern(block: &Block, len: usize) {
    let bytes = unsafe { std::slice::from_raw_parts_mut(block.as_ptr(), len) };
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
}

fn pattern_intact(block: &Block, len: usize) -> bool {
    let bytes = unsafe { std::slice::from_raw_parts(block.as_ptr(), len) };
    bytes.iter().enumerate().all(|(i, &b)| b == (i % 251) as u8)
}

#[test]
fn test_prefix_preserved_when_growing_and_shrinking() {
    let memory = subsystem();
    let cases = [
        (10usize, 5000usize),
        (5000, 10),
        (64, 65),
        (100_000, 400_000),
        (400_000, 3),
        (1 << 20, (1 << 20) + 1),
    ];

    for (old, new) in cases {
        let block = memory.allocate(old, DEFAULT_ALIGNMENT);
        write_pattern(&block, old);

        let block = memory
            .reallocate(Some(block), new, DEFAULT_ALIGNMENT)
            .expect("non-zero reallocate returns a block");
        assert!(memory.query_size(&block) >= new);
        assert!(pattern_intact(&block, old.min(new)), "{} -> {}", old, new);
        memory.release(block);
    }

    assert_eq!(memory.stats().live_blocks, 0);
}

#[test]
fn test_reallocate_to_zero_releases() {
    let memory = subsystem();
    let block = memory.allocate(128, DEFAULT_ALIGNMENT);
    assert!(memory.reallocate(Some(block), 0, DEFAULT_ALIGNMENT).is_none());

    let stats = memory.stats();
    assert_eq!(stats.live_blocks, 0);
    assert_eq!(stats.releases, 1);
}

#[test]
fn test_shrink_stays_in_place() {
    let memory = subsystem();
    let block = memory.allocate(1000, DEFAULT_ALIGNMENT);
    let address = block.address();
    let usable = memory.query_size(&block);

    let block = memory.reallocate(Some(block), 900, DEFAULT_ALIGNMENT).unwrap();
    assert_eq!(block.address(), address);
    assert_eq!(memory.query_size(&block), usable);
    assert_eq!(memory.block_info(&block).requested, 900);
    memory.release(block);
}

#[test]
fn test_alignment_change_moves_block() {
    let memory = subsystem();
    let block = memory.allocate(200, 8);
    write_pattern(&block, 200);

    let block = memory.reallocate(Some(block), 200, 4096).unwrap();
    assert_eq!(block.address() % 4096, 0);
    assert!(pattern_intact(&block, 200));
    assert_eq!(memory.stats().in_place_reallocations, 0);
    memory.release(block);
}

#[test]
fn test_reallocate_chain_keeps_counts_balanced() {
    let memory = subsystem();
    let mut block = memory.reallocate(None, 1, DEFAULT_ALIGNMENT);
    for size in (1..20).map(|i| i * 700) {
        block = memory.reallocate(block, size, DEFAULT_ALIGNMENT);
        assert_eq!(memory.live_blocks().len(), 1);
    }
    memory.release_opt(block);

    let stats = memory.stats();
    assert_eq!(stats.live_blocks, 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.allocations, stats.releases);
    assert_eq!(stats.reallocations, 19);
}

/*!
 * Debug Check Tests
 * Canary, header, double-release and use-after-release detection in checked
 * configurations
 */

use st_memory::core::limits::{
    CANARY_BYTE, DEFAULT_ALIGNMENT, POISON_BYTE, QUARANTINE_BLOCKS, TAIL_CANARY_LEN,
};
use st_memory::memory::{Block, MemoryConfig, MemoryError, MemorySubsystem};

fn subsystem() -> MemorySubsystem {
    MemorySubsystem::new(MemoryConfig::checked()).expect("checked config is always valid")
}

#[test]
#[should_panic(expected = "tail canary overwritten")]
fn test_overrun_detected_on_release() {
    let memory = subsystem();
    let block = memory.allocate(24, DEFAULT_ALIGNMENT);
    let usable = memory.query_size(&block);

    // One byte past the usable region
    unsafe { *block.as_ptr().add(usable) = 0 };
    memory.release(block);
}

#[test]
#[should_panic(expected = "tail canary overwritten")]
fn test_overrun_detected_by_heap_walk() {
    let memory = subsystem();
    let block = memory.allocate(100, 64);
    let usable = memory.query_size(&block);
    unsafe { *block.as_ptr().add(usable + 3) = !CANARY_BYTE };

    memory.verify_heap();
}

#[test]
#[should_panic(expected = "header overwritten")]
fn test_underrun_detected_on_reallocate() {
    let memory = subsystem();
    let block = memory.allocate(32, DEFAULT_ALIGNMENT);

    // The header's state magic sits in the eight bytes below the user pointer
    unsafe { std::ptr::write_bytes(block.as_ptr().sub(8), 0x41, 8) };
    let _ = memory.reallocate(Some(block), 4096, DEFAULT_ALIGNMENT);
}

#[test]
#[should_panic(expected = "released twice")]
fn test_double_release_detected() {
    let memory = subsystem();
    let raw = memory.allocate(64, DEFAULT_ALIGNMENT).into_raw();

    memory.release(unsafe { Block::from_raw(raw) });
    memory.release(unsafe { Block::from_raw(raw) });
}

#[test]
fn test_check_block_is_non_fatal() {
    let memory = subsystem();
    let block = memory.allocate(8, DEFAULT_ALIGNMENT);
    let usable = memory.query_size(&block);
    let tail = unsafe { block.as_ptr().add(usable + TAIL_CANARY_LEN - 1) };

    unsafe { *tail = 0 };
    match memory.check_block(&block) {
        Err(MemoryError::CorruptionDetected { address, .. }) => assert_eq!(address, block.address()),
        other => panic!("expected corruption, got {:?}", other),
    }

    unsafe { *tail = CANARY_BYTE };
    assert!(memory.check_block(&block).is_ok());
    memory.release(block);
}

#[test]
fn test_live_blocks_lists_every_allocation() {
    let memory = subsystem();
    let blocks: Vec<Block> = (1..=5).map(|i| memory.allocate(i * 10, DEFAULT_ALIGNMENT)).collect();

    let live = memory.live_blocks();
    assert_eq!(live.len(), 5);
    assert!(live.windows(2).all(|w| w[0].address < w[1].address));
    assert_eq!(memory.verify_heap(), 5);

    for block in blocks {
        memory.release(block);
    }
    assert!(memory.live_blocks().is_empty());
}

#[test]
fn test_released_block_is_poisoned_and_quarantined() {
    let memory = subsystem();
    let block = memory.allocate(40, DEFAULT_ALIGNMENT);
    let usable = memory.query_size(&block);
    let raw = block.into_raw();

    memory.release(unsafe { Block::from_raw(raw) });
    assert_eq!(memory.quarantined(), 1);

    // Still owned by the subsystem, so reading it back is sound
    let bytes = unsafe { std::slice::from_raw_parts(raw.as_ptr(), usable) };
    assert!(bytes.iter().all(|&b| b == POISON_BYTE));
    memory.verify_heap();
}

#[test]
#[should_panic(expected = "written after release")]
fn test_write_after_release_caught_by_heap_walk() {
    let memory = subsystem();
    let raw = memory.allocate(64, DEFAULT_ALIGNMENT).into_raw();
    memory.release(unsafe { Block::from_raw(raw) });

    unsafe { *raw.as_ptr().add(10) = 0x42 };
    memory.verify_heap();
}

#[test]
#[should_panic(expected = "written after release")]
fn test_write_after_release_caught_on_eviction() {
    let memory = subsystem();
    let raw = memory.allocate(64, DEFAULT_ALIGNMENT).into_raw();
    memory.release(unsafe { Block::from_raw(raw) });
    unsafe { *raw.as_ptr() = 0 };

    // Push the stale block out of the quarantine
    for _ in 0..QUARANTINE_BLOCKS {
        let block = memory.allocate(16, DEFAULT_ALIGNMENT);
        memory.release(block);
    }
}

#[test]
fn test_quarantine_is_bounded() {
    let memory = subsystem();
    for _ in 0..QUARANTINE_BLOCKS * 3 {
        let block = memory.allocate(128, DEFAULT_ALIGNMENT);
        memory.release(block);
    }
    assert_eq!(memory.quarantined(), QUARANTINE_BLOCKS);
    assert_eq!(memory.stats().live_blocks, 0);
    assert_eq!(memory.stats().live_bytes, 0);
}

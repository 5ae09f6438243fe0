/*!
 * Memory Guard Tests
 */

use pretty_assertions::assert_eq;
use st_memory::core::guard::*;
use st_memory::memory::{AllocationRequest, MemoryConfig, MemoryGuardExt, MemorySubsystem};

#[test]
fn test_memory_guard_auto_cleanup() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();

    {
        let mut guard = memory.allocate_guard(1024, 0);
        assert!(guard.is_active());
        assert_eq!(guard.resource_type(), "memory");
        assert_eq!(guard.metadata().size_bytes, 1024);

        guard.as_mut_slice().copy_from_slice(&[7u8; 1024]);
        assert!(guard.as_slice().iter().all(|&b| b == 7));
        assert_eq!(memory.stats().live_blocks, 1);
    }

    assert_eq!(memory.stats().live_blocks, 0);
}

#[test]
fn test_memory_guard_release_then_drop() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
    let mut guard = memory.allocate_guard(64, 64);
    assert_eq!(guard.address() % 64, 0);

    guard.release().unwrap();
    assert!(matches!(guard.release(), Err(GuardError::AlreadyReleased)));
    drop(guard);

    // Exactly one release reached the subsystem
    assert_eq!(memory.stats().releases, 1);
}

#[test]
fn test_guard_hands_block_back() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
    let guard = memory
        .try_allocate_guard(AllocationRequest::new(300).with_alignment(128))
        .unwrap();

    let block = guard.into_block().expect("guard was active");
    assert_eq!(block.address() % 128, 0);
    assert_eq!(memory.stats().live_blocks, 1);
    memory.release(block);
}

#[test]
fn test_guard_error_reports_rejected_request() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
    let err = memory
        .try_allocate_guard(AllocationRequest::new(8).with_alignment(48))
        .err()
        .unwrap();
    assert!(err.to_string().contains("Invalid alignment 48"));
}

/*!
 * Global Installation Tests
 * The process-wide subsystem is single-assignment
 */

use serial_test::serial;
use st_memory::memory::{exercise_installed, install, installed, MemoryConfig, MemoryError};

fn ensure_installed() {
    match install(MemoryConfig::checked()) {
        Ok(_) | Err(MemoryError::AlreadyInstalled) => {}
        Err(err) => panic!("install failed: {}", err),
    }
}

#[test]
#[serial]
fn test_install_is_single_assignment() {
    ensure_installed();
    let first = installed().expect("installed above");

    let err = install(MemoryConfig::unchecked()).unwrap_err();
    assert_eq!(err, MemoryError::AlreadyInstalled);

    // The original configuration is untouched
    let again = installed().unwrap();
    assert!(std::ptr::eq(first, again));
    assert!(again.checks_enabled());
}

#[test]
#[serial]
fn test_exercise_installed_retains_between_calls() {
    ensure_installed();
    let memory = installed().unwrap();

    exercise_installed();
    let first = memory.stats();
    let survivors = first.live_blocks;
    assert!(survivors > 0, "the first call keeps part of its batch alive");

    exercise_installed();
    let second = memory.stats();
    // Every survivor of the first call is released by the second, on top
    // of whatever the second call releases from its own batch
    assert!(second.releases - first.releases >= survivors);
    assert!(memory.verify_heap() as u64 <= second.live_blocks);
}

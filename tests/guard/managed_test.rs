/*!
 * Managed Value Tests
 * Construction through the subsystem, destruction exactly once
 */

use pretty_assertions::assert_eq;
use st_memory::core::guard::{ControlledConstruction, Managed};
use st_memory::memory::{MemoryConfig, MemoryGuardExt, MemorySubsystem};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Stand-in for a GUI object whose lifetime an ownership tree manages
#[derive(Debug)]
pub struct Widget {
    pub name: String,
    pub children: Vec<u32>,
    drops: Arc<AtomicUsize>,
}

impl ControlledConstruction for Widget {}

impl Widget {
    fn new(name: &str, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            drops: Arc::clone(drops),
        }
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_construct_and_drop_through_subsystem() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
    let drops = Arc::new(AtomicUsize::new(0));

    {
        let mut widget = memory.construct(Widget::new("root", &drops));
        widget.children.extend([1, 2, 3]);
        assert_eq!(widget.name, "root");
        assert_eq!(widget.children.len(), 3);

        let info = memory.live_blocks();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].address, widget.address());
        assert_eq!(info[0].requested, std::mem::size_of::<Widget>());
    }

    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(memory.stats().live_blocks, 0);
}

#[test]
fn test_handle_reassignment_destroys_previous_value() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
    let drops = Arc::new(AtomicUsize::new(0));

    let mut current = Managed::new(&memory, Widget::new("first", &drops));
    assert_eq!(current.name, "first");

    // Moving a new handle in drops the old one; values are never copied
    current = Managed::new(&memory, Widget::new("second", &drops));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(current.name, "second");
    assert_eq!(memory.stats().live_blocks, 1);

    drop(current);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_into_inner_releases_storage_keeps_value() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
    let drops = Arc::new(AtomicUsize::new(0));

    let widget = memory.construct(Widget::new("detached", &drops)).into_inner();
    assert_eq!(memory.stats().live_blocks, 0);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert_eq!(widget.name, "detached");

    drop(widget);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_many_managed_values() {
    let memory = MemorySubsystem::new(MemoryConfig::checked()).unwrap();
    let drops = Arc::new(AtomicUsize::new(0));

    let widgets: Vec<_> = (0..100)
        .map(|i| memory.construct(Widget::new(&format!("w{}", i), &drops)))
        .collect();
    assert_eq!(memory.verify_heap(), 100);
    assert_eq!(widgets[42].name, "w42");

    drop(widgets);
    assert_eq!(drops.load(Ordering::SeqCst), 100);
    assert_eq!(memory.stats().live_blocks, 0);
}

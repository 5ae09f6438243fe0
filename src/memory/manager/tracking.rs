/*!
 * Allocation Tracking
 * Lock-free counters behind `MemoryStats`
 */

use crate::core::types::Size;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Subsystem-wide counters
///
/// # Performance
/// - Cache-line aligned so the hot counters do not share a line with the
///   subsystem's read-only configuration
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub(super) struct Counters {
    allocations: AtomicU64,
    releases: AtomicU64,
    reallocations: AtomicU64,
    in_place_reallocations: AtomicU64,
    heap_checks: AtomicU64,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
}

/// Point-in-time copy of [`Counters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct CounterSnapshot {
    pub allocations: u64,
    pub releases: u64,
    pub reallocations: u64,
    pub in_place_reallocations: u64,
    pub heap_checks: u64,
    pub live_bytes: Size,
    pub peak_bytes: Size,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_allocation(&self, usable: Size) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        let live = self.live_bytes.fetch_add(usable, Ordering::Relaxed) + usable;
        self.peak_bytes.fetch_max(live, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_release(&self, usable: Size) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(usable, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reallocation(&self, in_place: bool) {
        self.reallocations.fetch_add(1, Ordering::Relaxed);
        if in_place {
            self.in_place_reallocations.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_heap_check(&self) {
        self.heap_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            reallocations: self.reallocations.load(Ordering::Relaxed),
            in_place_reallocations: self.in_place_reallocations.load(Ordering::Relaxed),
            heap_checks: self.heap_checks.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
        }
    }
}

impl CounterSnapshot {
    /// Blocks allocated and not yet released
    pub fn live_blocks(&self) -> u64 {
        self.allocations.saturating_sub(self.releases)
    }
}

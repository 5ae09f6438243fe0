/*!
 * ST Memory
 *
 * Alignment-aware memory subsystem: per-target byte primitives, a size-class
 * quantizing allocator with debug canaries, owning construction handles and
 * a heap exerciser for operator-driven corruption hunting.
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{MemoryError, MemoryResult};
pub use crate::core::guard::{ControlledConstruction, Guard, GuardError, Managed, MemoryGuard};
pub use memory::{
    exercise_installed, init_backend, install, installed, AllocationRequest, Allocator, Block,
    BlockInfo, HeapExerciser, HeapKind, MemoryConfig, MemoryGuardExt, MemoryInfo, MemoryStats,
    MemorySubsystem,
};
pub use monitoring::init_tracing;

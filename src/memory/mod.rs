/*!
 * Memory Module
 * Backend primitives, the allocating subsystem and its diagnostics
 */

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod global;
pub mod manager;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use backend::{
    init_backend, mem_copy, mem_set, mem_zero, CopyTier, MemoryBackend, PlatformBackend,
    PortableBackend, SimdBackend,
};
pub use config::{HeapKind, MemoryConfig};
pub use diagnostics::{exercise_installed, ExerciseSummary, ExerciserConfig, HeapExerciser};
pub use global::{install, installed};
pub use manager::{AlignmentPolicy, MemoryGuardExt, MemorySubsystem, SizeClassTable};
pub use traits::*;
pub use types::*;

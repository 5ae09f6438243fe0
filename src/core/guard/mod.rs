/*!
 * RAII Resource Guards
 *
 * Owning handles whose destruction path goes back through the memory
 * subsystem.
 *
 * ## Guard Types
 *
 * - **MemoryGuard**: Scoped raw block, released on drop
 * - **Managed**: One value of a `ControlledConstruction` type, constructed in
 *   subsystem storage and destroyed through it
 *
 * ## Example
 *
 * ```rust
 * use st_memory::core::guard::{ControlledConstruction, Guard};
 * use st_memory::memory::manager::MemoryGuardExt;
 * use st_memory::memory::{MemoryConfig, MemorySubsystem};
 *
 * struct Widget {
 *     width: u32,
 * }
 * impl ControlledConstruction for Widget {}
 *
 * let memory = MemorySubsystem::new(MemoryConfig::default())?;
 *
 * // Scoped raw block, zeroed, freed on drop
 * let mut scratch = memory.allocate_guard(256, 0);
 * scratch.as_mut_slice()[0] = 1;
 * assert!(scratch.is_active());
 *
 * // Managed value, destructor then release on drop
 * let widget = memory.construct(Widget { width: 640 });
 * assert_eq!(widget.width, 640);
 * # Ok::<(), st_memory::core::MemoryError>(())
 * ```
 */

mod managed;
mod memory;
mod traits;

pub use managed::{ControlledConstruction, Managed};
pub use memory::MemoryGuard;
pub use traits::{Guard, GuardDrop};

use crate::core::errors::MemoryError;
use miette::Diagnostic;
use std::time::Instant;
use thiserror::Error;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum GuardError {
    #[error("Resource already released")]
    #[diagnostic(
        code(guard::already_released),
        help("A guard releases its resource once; later releases are rejected.")
    )]
    AlreadyReleased,

    #[error("Guard allocation failed: {0}")]
    #[diagnostic(code(guard::allocation))]
    Allocation(#[from] MemoryError),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: Instant,
    pub size_bytes: usize,
    pub alignment: usize,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: Instant::now(),
            size_bytes: 0,
            alignment: 0,
        }
    }

    #[inline]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size_bytes = size;
        self
    }

    #[inline]
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}

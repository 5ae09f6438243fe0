/*!
 * Core Module
 * Portable types, limits, error handling, and resource guards
 */

pub mod errors;
pub mod guard;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use guard::{
    ControlledConstruction, Guard, GuardDrop, GuardError, GuardMetadata, GuardResult, Managed,
    MemoryGuard,
};
pub use types::*;

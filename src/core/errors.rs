/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory subsystem errors
///
/// Only the `try_*` entry points surface these to callers. The infallible API
/// treats exhaustion and corruption as fatal.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes with alignment {alignment}")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("The native heap could not satisfy the request. Release blocks or lower the request size.")
    )]
    OutOfMemory { requested: usize, alignment: usize },

    #[error("Allocation size overflow: {requested} bytes with alignment {alignment}")]
    #[diagnostic(
        code(memory::size_overflow),
        help("Size plus bookkeeping exceeds the address space.")
    )]
    SizeOverflow { requested: usize, alignment: usize },

    #[error("Invalid alignment {0}: must be 0 (default) or a power of two")]
    #[diagnostic(
        code(memory::invalid_alignment),
        help("Pass DEFAULT_ALIGNMENT or a power of two such as 8, 16, 32 or 64.")
    )]
    InvalidAlignment(usize),

    #[error("Memory corruption detected at 0x{address:x}: {reason}")]
    #[diagnostic(
        code(memory::corruption),
        help("A write went past the end of a block or into released memory.")
    )]
    CorruptionDetected { address: usize, reason: String },

    #[error("Block at 0x{0:x} released twice or never allocated by this subsystem")]
    #[diagnostic(
        code(memory::double_release),
        help("Each block must be released exactly once.")
    )]
    DoubleRelease(usize),

    #[error("Invalid memory configuration: {0}")]
    #[diagnostic(
        code(memory::invalid_config),
        help("Check STMEM_HEAP, STMEM_CHECKS and STMEM_TRACK_BLOCKS.")
    )]
    InvalidConfig(String),

    #[error("Memory subsystem already installed")]
    #[diagnostic(
        code(memory::already_installed),
        help("The global subsystem is configured once at startup and cannot be replaced.")
    )]
    AlreadyInstalled,
}

impl MemoryError {
    /// Whether the error reflects a broken heap rather than a rejected request
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            MemoryError::CorruptionDetected { .. } | MemoryError::DoubleRelease(_)
        )
    }
}

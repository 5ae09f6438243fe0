/*!
 * Global Memory Subsystem
 *
 * Single-assignment process-wide handle for code that cannot be handed an
 * explicit `&MemorySubsystem`. Installed once at startup, never torn down.
 */

use super::config::MemoryConfig;
use super::manager::MemorySubsystem;
use super::types::{MemoryError, MemoryResult};
use std::sync::OnceLock;
use tracing::{info, warn};

static GLOBAL: OnceLock<MemorySubsystem> = OnceLock::new();

/// Build and install the process-wide subsystem
///
/// Fails with `AlreadyInstalled` on every call after the first success.
pub fn install(config: MemoryConfig) -> MemoryResult<&'static MemorySubsystem> {
    if GLOBAL.get().is_some() {
        warn!("Global memory subsystem install attempted twice");
        return Err(MemoryError::AlreadyInstalled);
    }

    let subsystem = MemorySubsystem::new(config)?;
    GLOBAL
        .set(subsystem)
        .map_err(|_| MemoryError::AlreadyInstalled)?;

    let installed = GLOBAL.get().ok_or(MemoryError::AlreadyInstalled)?;
    info!(config = ?installed.config(), "Global memory subsystem installed");
    Ok(installed)
}

/// The installed subsystem, if any
#[inline]
pub fn installed() -> Option<&'static MemorySubsystem> {
    GLOBAL.get()
}

/*!
 * Memory Configuration
 *
 * Built once at process startup and handed to the subsystem constructor
 */

use super::types::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Native heap that services raw requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeapKind {
    /// The platform allocator (`std::alloc::System`)
    System,
    /// jemalloc, available with the `jemalloc` feature
    Jemalloc,
}

impl HeapKind {
    /// Whether this build can service requests from the heap
    pub fn is_available(&self) -> bool {
        match self {
            HeapKind::System => true,
            HeapKind::Jemalloc => cfg!(all(feature = "jemalloc", not(target_env = "msvc"))),
        }
    }
}

impl fmt::Display for HeapKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HeapKind::System => write!(f, "system"),
            HeapKind::Jemalloc => write!(f, "jemalloc"),
        }
    }
}

impl FromStr for HeapKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" | "libc" => Ok(HeapKind::System),
            "jemalloc" => Ok(HeapKind::Jemalloc),
            other => Err(MemoryError::InvalidConfig(format!(
                "unknown heap '{}' (expected system or jemalloc)",
                other
            ))),
        }
    }
}

/// Memory subsystem configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Native heap backing every block
    pub heap: HeapKind,
    /// Canaries, junk fill and poisoning
    pub checks: bool,
    /// Keep a registry of live blocks for double-release detection and heap walks
    pub track_blocks: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let checks = cfg!(debug_assertions);
        Self {
            heap: HeapKind::System,
            checks,
            track_blocks: checks,
        }
    }
}

impl MemoryConfig {
    /// Configuration with every debug facility enabled
    pub fn checked() -> Self {
        Self {
            heap: HeapKind::System,
            checks: true,
            track_blocks: true,
        }
    }

    /// Configuration with no debug facilities
    pub fn unchecked() -> Self {
        Self {
            heap: HeapKind::System,
            checks: false,
            track_blocks: false,
        }
    }

    pub fn with_heap(mut self, heap: HeapKind) -> Self {
        self.heap = heap;
        self
    }

    pub fn with_checks(mut self, checks: bool) -> Self {
        self.checks = checks;
        self
    }

    pub fn with_track_blocks(mut self, track_blocks: bool) -> Self {
        self.track_blocks = track_blocks;
        self
    }

    /// Load configuration from the environment on top of the defaults
    ///
    /// Environment variables:
    /// - STMEM_HEAP: `system` or `jemalloc` (default: system)
    /// - STMEM_CHECKS: enable canaries and poisoning (default: debug builds)
    /// - STMEM_TRACK_BLOCKS: enable the live-block registry (default: follows checks)
    pub fn from_env() -> MemoryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> MemoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(heap) = lookup("STMEM_HEAP") {
            config.heap = heap.parse()?;
        }
        if let Some(checks) = lookup("STMEM_CHECKS") {
            config.checks = parse_flag("STMEM_CHECKS", &checks)?;
            config.track_blocks = config.checks;
        }
        if let Some(track) = lookup("STMEM_TRACK_BLOCKS") {
            config.track_blocks = parse_flag("STMEM_TRACK_BLOCKS", &track)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings this build cannot honor
    pub fn validate(&self) -> MemoryResult<()> {
        if !self.heap.is_available() {
            return Err(MemoryError::InvalidConfig(format!(
                "heap '{}' is not compiled in (enable the '{}' feature)",
                self.heap, self.heap
            )));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> MemoryResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MemoryError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/*!
 * System Limits and Constants
 *
 * Centralized location for allocator-wide limits, thresholds, and magic numbers.
 * Organized by domain for maintainability and discoverability.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Debug-check constants are marked with [DEBUG]
 */

// =============================================================================
// ALIGNMENT
// =============================================================================

/// Request the allocator's default alignment policy
pub const DEFAULT_ALIGNMENT: usize = 0;

/// Minimum allocator alignment; smaller explicit requests are promoted
pub const MIN_ALIGNMENT: usize = 8;

/// Alignment used by the default policy for blocks of at least this size
pub const LARGE_BLOCK_ALIGNMENT: usize = 16;

/// Size at which the default policy switches from 8 to 16 byte alignment
pub const LARGE_ALIGNMENT_THRESHOLD: usize = 16;

// =============================================================================
// SIZE CLASSES
// =============================================================================

/// Largest size served from the size class table (64KB)
pub const MAX_CLASS_SIZE: usize = 64 * 1024;

/// Granularity above the class table (4KB)
/// [PERF] Aligned with common page size
pub const PAGE_SIZE: usize = 4 * 1024;

// =============================================================================
// BACKEND THRESHOLDS
// =============================================================================

/// SIMD operation threshold (64 bytes)
/// [PERF] Below this, scalar copies are faster due to SIMD setup overhead
pub const MEMORY_SIMD_THRESHOLD: usize = 64;

/// Size at which `CopyTier` selects the big-block copy (256KB)
/// [PERF] Roughly where copies stop fitting in L2
pub const BIG_BLOCK_THRESHOLD: usize = 256 * 1024;

/// Chunk size for big-block copies (4KB)
/// [PERF] Prefetch distance for the next chunk
pub const BIG_BLOCK_CHUNK: usize = 4 * 1024;

/// Size above which one-shot transfers should use streaming stores (1MB)
/// [PERF] Larger than typical L2, so caching the destination only evicts useful data
pub const STREAMING_THRESHOLD: usize = 1024 * 1024;

// =============================================================================
// DEBUG CHECKS
// =============================================================================

/// Number of canary bytes written after every block's usable region
/// [DEBUG]
pub const TAIL_CANARY_LEN: usize = 16;

/// Canary byte value
/// [DEBUG]
pub const CANARY_BYTE: u8 = 0xFD;

/// Byte used for junk-filling new allocations
/// [DEBUG]
pub const JUNK_BYTE: u8 = 0xCD;

/// Poison byte written to released memory
/// [DEBUG]
pub const POISON_BYTE: u8 = 0xDD;

/// Released blocks held back from the native heap in checked configurations
/// [DEBUG] Poison in these blocks is re-checked before the memory is reused
pub const QUARANTINE_BLOCKS: usize = 64;

/// Byte cap on quarantined usable memory (4MB)
/// [DEBUG] Whichever of the two caps is hit first evicts the oldest block
pub const QUARANTINE_BYTES: usize = 4 * 1024 * 1024;

/// Header state for a live block
pub const LIVE_MAGIC: u64 = 0x5354_4d45_4d5f_4c56; // "STMEM_LV"

/// Header state for a released block
pub const FREED_MAGIC: u64 = 0x5354_4d45_4d5f_4652; // "STMEM_FR"

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Allocations performed per exerciser invocation
pub const EXERCISE_BATCH: usize = 256;

/// Largest block the exerciser requests (1MB)
pub const EXERCISE_MAX_SIZE: usize = 1024 * 1024;

/// Fraction of exerciser blocks kept alive until the next invocation
pub const EXERCISE_RETAIN_RATIO: f64 = 0.125;

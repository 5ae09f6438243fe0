/*!
 * Platform-specific SIMD Detection
 * Detects available SIMD instruction sets
 */

use serde::{Deserialize, Serialize};

/// Vector units the backend kernels dispatch on
///
/// Only features with a matching kernel are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimdCapabilities {
    /// SSE2 support (x86_64)
    pub sse2: bool,
    /// AVX2 support (x86_64)
    pub avx2: bool,
    /// NEON support (aarch64)
    pub neon: bool,
}

impl SimdCapabilities {
    /// Capabilities of a target with no vector unit in use
    pub const fn scalar() -> Self {
        Self {
            sse2: false,
            avx2: false,
            neon: false,
        }
    }

    /// Widest vector register the backend kernels will use, in bytes
    pub fn max_vector_bytes(&self) -> usize {
        if self.avx2 {
            32
        } else if self.sse2 || self.neon {
            16
        } else {
            std::mem::size_of::<usize>()
        }
    }
}

/// Detect available SIMD instruction sets
pub fn detect_simd_support() -> SimdCapabilities {
    #[cfg(target_arch = "x86_64")]
    {
        SimdCapabilities {
            sse2: is_x86_feature_detected!("sse2"),
            avx2: is_x86_feature_detected!("avx2"),
            neon: false,
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        SimdCapabilities {
            neon: std::arch::is_aarch64_feature_detected!("neon"),
            ..SimdCapabilities::scalar()
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        SimdCapabilities::scalar()
    }
}

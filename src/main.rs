/*!
 * stmem - Memory Subsystem Operator Tool
 *
 * Installs the process-wide memory subsystem from the environment, drives
 * the heap exerciser and a concurrent allocate/release pass, then prints the
 * final statistics as JSON.
 */

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use st_memory::{exercise_installed, init_backend, init_tracing, install, Allocator, MemoryConfig};
use std::thread;
use tracing::info;

/// Allocate/release cycles per worker thread
const CYCLES_PER_THREAD: usize = 10_000;

/// Largest block a worker requests
const WORKER_MAX_SIZE: usize = 16 * 1024;

/// Alignments a worker draws from; 0 selects the default policy
const WORKER_ALIGNMENTS: [usize; 5] = [0, 8, 16, 32, 64];

fn main() -> Result<()> {
    // Initialize structured tracing
    init_tracing();

    info!("stmem starting...");
    info!("================================================");

    // Detect SIMD capabilities
    info!("Detecting SIMD capabilities...");
    let caps = init_backend();
    info!(
        "SIMD ready: AVX2={}, SSE2={}, NEON={}, max_vector={}B",
        caps.avx2,
        caps.sse2,
        caps.neon,
        caps.max_vector_bytes()
    );

    info!("Initializing memory subsystem...");
    let config = MemoryConfig::from_env().context("invalid memory configuration")?;
    let memory = install(config).context("installing memory subsystem")?;

    let rounds = env_usize("STMEM_EXERCISE_ROUNDS", 8)?;
    let threads = env_usize("STMEM_THREADS", 4)?;

    info!(rounds, "Running heap exerciser...");
    for _ in 0..rounds {
        exercise_installed();
    }

    info!(threads, cycles = CYCLES_PER_THREAD, "Running concurrent allocation pass...");
    concurrent_pass(memory, threads);

    // One more exerciser pass releases the survivors and walks the heap
    exercise_installed();
    let verified = memory.verify_heap();
    info!(verified, "Heap verified");

    let stats = memory.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    info!("================================================");
    info!("stmem finished");
    Ok(())
}

/// Independent allocate/write/release cycles on disjoint blocks
fn concurrent_pass(allocator: &dyn Allocator, threads: usize) {
    thread::scope(|scope| {
        for worker in 0..threads {
            scope.spawn(move || {
                let mut rng = SmallRng::seed_from_u64(worker as u64);
                for _ in 0..CYCLES_PER_THREAD {
                    let size = rng.gen_range(0..=WORKER_MAX_SIZE);
                    let alignment = WORKER_ALIGNMENTS[rng.gen_range(0..WORKER_ALIGNMENTS.len())];

                    let block = allocator.allocate(size, alignment);
                    let bytes = unsafe { std::slice::from_raw_parts_mut(block.as_ptr(), size) };
                    bytes.fill(worker as u8);

                    let block = if rng.gen_bool(0.1) {
                        allocator.reallocate(Some(block), size * 2 + 1, alignment)
                    } else {
                        Some(block)
                    };
                    if let Some(block) = block {
                        allocator.release(block);
                    }
                }
            });
        }
    });
}

fn env_usize(key: &str, default: usize) -> Result<usize> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, value)),
        Err(_) => Ok(default),
    }
}

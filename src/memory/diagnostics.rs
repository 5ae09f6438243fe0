/*!
 * Heap Exerciser
 *
 * Operator-invoked stress routine. Each invocation first releases the blocks
 * kept by the previous one, then runs a randomized batch of allocations and
 * keeps a fraction of them alive. Damage done to those survivors between two
 * invocations shows up in the release checks of the next one.
 *
 * This is a probabilistic corruption detector, not an oracle: the only
 * outcomes are "returned" and "terminated".
 */

use super::backend::{MemoryBackend, PlatformBackend};
use super::global;
use super::manager::{AlignmentPolicy, MemorySubsystem};
use super::types::Block;
use crate::core::limits::{
    DEFAULT_ALIGNMENT, EXERCISE_BATCH, EXERCISE_MAX_SIZE, EXERCISE_RETAIN_RATIO,
};
use crate::monitoring::span_operation;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Alignments the exerciser draws from
const ALIGNMENTS: [usize; 7] = [DEFAULT_ALIGNMENT, 8, 16, 32, 64, 128, 4096];

/// Exerciser tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciserConfig {
    /// Allocations per invocation
    pub batch: usize,
    /// Largest requested size
    pub max_size: usize,
    /// Fraction of blocks kept until the next invocation
    pub retain_ratio: f64,
    /// Fraction of blocks resized once before being kept or released
    pub realloc_ratio: f64,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for ExerciserConfig {
    fn default() -> Self {
        Self {
            batch: EXERCISE_BATCH,
            max_size: EXERCISE_MAX_SIZE,
            retain_ratio: EXERCISE_RETAIN_RATIO,
            realloc_ratio: 0.25,
            seed: None,
        }
    }
}

impl ExerciserConfig {
    fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }
}

/// Counts from one invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub released_previous: usize,
    pub verified: usize,
    pub allocated: usize,
    pub reallocated: usize,
    pub released: usize,
    pub retained: usize,
}

/// Heap exerciser bound to one subsystem
///
/// `exercise` takes `&mut self`, so one exerciser can never run concurrently
/// with itself. Dropping it releases whatever it still retains.
pub struct HeapExerciser<'a, B: MemoryBackend = PlatformBackend> {
    memory: &'a MemorySubsystem<B>,
    config: ExerciserConfig,
    rng: SmallRng,
    retained: Vec<Block>,
    rounds: u64,
}

impl<'a, B: MemoryBackend> HeapExerciser<'a, B> {
    pub fn new(memory: &'a MemorySubsystem<B>) -> Self {
        Self::with_config(memory, ExerciserConfig::default())
    }

    pub fn with_config(memory: &'a MemorySubsystem<B>, config: ExerciserConfig) -> Self {
        let rng = config.rng();
        Self {
            memory,
            config,
            rng,
            retained: Vec::new(),
            rounds: 0,
        }
    }

    /// Run one invocation
    pub fn exercise(&mut self) {
        self.rounds += 1;
        let span = span_operation("heap_exercise");
        let _entered = span.enter();

        let summary = run_round(self.memory, &self.config, &mut self.rng, &mut self.retained);
        span.record_items_processed(summary.allocated);
        // Violations never return, so reaching here means the round passed
        span.record_result(true);
        info!(
            operation_id = span.id(),
            round = self.rounds,
            released_previous = summary.released_previous,
            verified = summary.verified,
            allocated = summary.allocated,
            reallocated = summary.reallocated,
            retained = summary.retained,
            "Heap exercise complete"
        );
    }

    /// Blocks held over for the next invocation
    pub fn retained(&self) -> usize {
        self.retained.len()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

impl<B: MemoryBackend> Drop for HeapExerciser<'_, B> {
    fn drop(&mut self) {
        for block in self.retained.drain(..) {
            self.memory.release(block);
        }
    }
}

// Retained blocks for the installed subsystem, shared across calls
static INSTALLED_RETAINED: Mutex<Vec<Block>> = parking_lot::const_mutex(Vec::new());

/// Run one invocation against the installed global subsystem
///
/// Blocks retained here live until the next call. Logs a warning and does
/// nothing if no subsystem is installed.
pub fn exercise_installed() {
    let memory = match global::installed() {
        Some(memory) => memory,
        None => {
            warn!("Heap exercise skipped: no memory subsystem installed");
            return;
        }
    };

    let span = span_operation("heap_exercise_installed");
    let _entered = span.enter();

    let config = ExerciserConfig::default();
    let mut rng = config.rng();
    let mut retained = INSTALLED_RETAINED.lock();
    let summary = run_round(memory, &config, &mut rng, &mut retained);
    span.record_items_processed(summary.allocated);
    span.record_result(true);
    info!(
        operation_id = span.id(),
        released_previous = summary.released_previous,
        allocated = summary.allocated,
        retained = summary.retained,
        "Installed heap exercise complete"
    );
}

fn run_round<B: MemoryBackend>(
    memory: &MemorySubsystem<B>,
    config: &ExerciserConfig,
    rng: &mut SmallRng,
    retained: &mut Vec<Block>,
) -> ExerciseSummary {
    let mut summary = ExerciseSummary {
        released_previous: retained.len(),
        ..Default::default()
    };

    // Releasing runs the canary and header checks on every survivor
    for block in retained.drain(..) {
        memory.release(block);
    }

    if memory.checks_enabled() {
        summary.verified = memory.verify_heap();
    }

    for _ in 0..config.batch {
        let size = random_size(rng, config.max_size);
        let alignment = ALIGNMENTS[rng.gen_range(0..ALIGNMENTS.len())];
        let tag: u8 = rng.gen();

        let block = memory.allocate(size, alignment);
        summary.allocated += 1;
        check_contract(memory, &block, size, alignment);
        unsafe { B::fill(block.as_ptr(), tag, size) };

        let block = if rng.gen_bool(config.realloc_ratio) {
            let new_size = random_size(rng, config.max_size).max(1);
            let block = match memory.reallocate(Some(block), new_size, alignment) {
                Some(block) => block,
                None => violation(format!("reallocate to {} bytes returned no block", new_size)),
            };
            summary.reallocated += 1;
            check_contract(memory, &block, new_size, alignment);

            let kept = size.min(new_size);
            let prefix = unsafe { std::slice::from_raw_parts(block.as_ptr(), kept) };
            if let Some(offset) = prefix.iter().position(|&b| b != tag) {
                violation(format!(
                    "reallocate lost byte {} of {} at 0x{:x}",
                    offset,
                    kept,
                    block.address()
                ));
            }
            block
        } else {
            block
        };

        if rng.gen_bool(config.retain_ratio) {
            retained.push(block);
            summary.retained += 1;
        } else {
            memory.release(block);
            summary.released += 1;
        }
    }

    summary
}

/// Log-distributed size in `0..=max_size`
fn random_size(rng: &mut SmallRng, max_size: usize) -> usize {
    if max_size == 0 {
        return 0;
    }
    let bits = usize::BITS - max_size.leading_zeros();
    let shift = rng.gen_range(0..=bits);
    let bound = if shift >= usize::BITS {
        max_size
    } else {
        (1usize << shift).min(max_size)
    };
    rng.gen_range(0..=bound)
}

fn check_contract<B: MemoryBackend>(
    memory: &MemorySubsystem<B>,
    block: &Block,
    size: usize,
    alignment: usize,
) {
    let usable = memory.query_size(block);
    if usable < size {
        violation(format!(
            "block at 0x{:x} reports {} usable bytes for a {} byte request",
            block.address(),
            usable,
            size
        ));
    }

    // The exerciser only draws valid alignments
    let required = AlignmentPolicy::resolve(size, alignment).unwrap_or(alignment.max(1));
    if block.address() % required != 0 {
        violation(format!(
            "block at 0x{:x} is not {}-byte aligned",
            block.address(),
            required
        ));
    }
}

#[cold]
fn violation(message: String) -> ! {
    error!(%message, "Heap exerciser detected a contract violation");
    panic!("heap exerciser: {}", message)
}

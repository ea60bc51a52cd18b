//! Stacked application of mutation operators over one buffer.

use crate::config::HavocSettings;
use crate::mutation::{self, MutationOp, SizeEffect};
use crate::select;
use rand_core::RngCore;
use thiserror::Error;

/// Errors surfaced by a havoc run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HavocError {
    /// The caller handed in bounds no operator could ever work with. Nothing
    /// was mutated.
    #[error("invalid buffer bounds for havoc: size {size} with capacity {capacity}")]
    InvalidBounds { size: usize, capacity: usize },
    /// Operators kept failing despite passing the eligibility filter. This is
    /// a logic error in buffer sizing or in the filter itself, not a
    /// recoverable fuzzing event.
    #[error("havoc stalled after {failures} consecutive failed mutations")]
    Stalled { failures: u32 },
}

/// Drives one randomized edit pass: draws an operator count, then repeatedly
/// filters the catalog by current size/capacity feasibility, picks an
/// eligible operator uniformly, and applies it.
///
/// The engine holds no per-run state, so one instance can serve many
/// sequential calls; concurrent callers run one engine, one buffer, and one
/// generator per worker.
pub struct HavocEngine {
    ops: Vec<MutationOp>,
    settings: HavocSettings,
}

impl Default for HavocEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HavocEngine {
    /// Creates an engine with the standard operator catalog and default
    /// tuning.
    pub fn new() -> Self {
        Self::with_settings(HavocSettings::default())
    }

    /// Creates an engine with the standard operator catalog and explicit
    /// tuning.
    pub fn with_settings(settings: HavocSettings) -> Self {
        Self {
            ops: mutation::havoc_set(),
            settings,
        }
    }

    /// The operator catalog this engine draws from.
    pub fn operations(&self) -> &[MutationOp] {
        &self.ops
    }

    /// Applies a randomized stack of mutations to the value occupying
    /// `buffer[..size]` and returns the new value size.
    ///
    /// `buffer.len()` is the capacity; bytes past the returned size are
    /// unspecified scratch. For a fixed generator seed and fixed inputs the
    /// operator sequence and output are exactly reproducible.
    pub fn havoc(
        &self,
        buffer: &mut [u8],
        size: usize,
        rng: &mut dyn RngCore,
    ) -> Result<usize, HavocError> {
        let capacity = buffer.len();
        if size > capacity || (size == 0 && capacity == 0) {
            return Err(HavocError::InvalidBounds { size, capacity });
        }

        let iterations = select::stacked_count(self.settings.max_stack_power, rng);
        let mut current = size;
        let mut completed = 0u32;
        let mut consecutive_failures = 0u32;
        let mut eligible: Vec<&MutationOp> = Vec::with_capacity(self.ops.len());

        while completed < iterations {
            // Three independent feasibility conditions decide eligibility.
            // The must-reduce case is unreachable past the bounds check above
            // but keeps the filter total.
            let can_increase = capacity > current;
            let must_increase = current == 0;
            let must_reduce = current > capacity;
            eligible.clear();
            eligible.extend(self.ops.iter().filter(|op| {
                (!must_increase || op.effect() == SizeEffect::Increasing)
                    && (!must_reduce || op.effect() == SizeEffect::Reducing)
                    && (can_increase || op.effect() != SizeEffect::Increasing)
            }));
            if eligible.is_empty() {
                return Err(HavocError::Stalled {
                    failures: consecutive_failures,
                });
            }

            let op = *select::pick(&eligible, rng);
            match op.apply(buffer, current, rng) {
                Some(new_size) => {
                    debug_assert!(new_size <= capacity, "{} overran capacity", op.name());
                    current = new_size;
                    completed += 1;
                    consecutive_failures = 0;
                }
                None => {
                    // Transient infeasibility: retry with a fresh draw, but
                    // bound the retries so a hopeless configuration fails
                    // instead of spinning.
                    consecutive_failures += 1;
                    if consecutive_failures >= self.settings.max_failed_mutations {
                        return Err(HavocError::Stalled {
                            failures: consecutive_failures,
                        });
                    }
                }
            }
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    #[test]
    fn havoc_rejects_zero_capacity() {
        let engine = HavocEngine::new();
        let mut rng = ChaCha8Rng::from_seed([0u8; 32]);
        let result = engine.havoc(&mut [], 0, &mut rng);
        assert_eq!(
            result,
            Err(HavocError::InvalidBounds {
                size: 0,
                capacity: 0
            })
        );
    }

    #[test]
    fn havoc_rejects_size_beyond_capacity() {
        let engine = HavocEngine::new();
        let mut rng = ChaCha8Rng::from_seed([1u8; 32]);
        let mut buffer = [0u8; 4];
        let result = engine.havoc(&mut buffer, 5, &mut rng);
        assert_eq!(
            result,
            Err(HavocError::InvalidBounds {
                size: 5,
                capacity: 4
            })
        );
    }

    #[test]
    fn havoc_result_stays_within_capacity() {
        let engine = HavocEngine::new();
        let mut rng = ChaCha8Rng::from_seed([2u8; 32]);
        for round in 0..500 {
            let mut buffer = [0xA5u8; 24];
            let size = round % 25;
            let new_size = engine
                .havoc(&mut buffer, size, &mut rng)
                .expect("havoc with free capacity must succeed");
            assert!(new_size <= 24);
        }
    }

    #[test]
    fn havoc_grows_an_empty_value() {
        let engine = HavocEngine::new();
        let mut rng = ChaCha8Rng::from_seed([3u8; 32]);
        for _ in 0..100 {
            let mut buffer = [0u8; 16];
            let new_size = engine.havoc(&mut buffer, 0, &mut rng).unwrap();
            assert!(new_size >= 1, "only size-increasing operators are eligible at size 0");
        }
    }

    #[test]
    fn havoc_on_full_buffer_never_needs_more_room() {
        let engine = HavocEngine::new();
        let mut rng = ChaCha8Rng::from_seed([4u8; 32]);
        for _ in 0..200 {
            let mut buffer = [0x3Cu8; 8];
            let new_size = engine.havoc(&mut buffer, 8, &mut rng).unwrap();
            assert!(new_size <= 8);
        }
    }

    #[test]
    fn exhausted_retry_budget_surfaces_as_stalled() {
        // A full single-byte buffer keeps the reducers and the wide
        // arithmetic entries eligible but infeasible; with a budget of one,
        // the first such draw must end the run as an error.
        let engine = HavocEngine::with_settings(HavocSettings {
            max_stack_power: 5.0,
            max_failed_mutations: 1,
        });
        let mut stalled = 0;
        for seed in 0..200u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut buffer = [0x80u8; 1];
            match engine.havoc(&mut buffer, 1, &mut rng) {
                Ok(new_size) => assert_eq!(new_size, 1),
                Err(HavocError::Stalled { failures }) => {
                    assert_eq!(failures, 1);
                    stalled += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert!(
            stalled > 0,
            "an infeasible draw must trip the one-attempt budget"
        );
    }

    #[test]
    fn havoc_is_reproducible_for_a_fixed_seed() {
        let engine = HavocEngine::new();

        let mut first = [0u8; 32];
        first[..8].copy_from_slice(&1u64.to_le_bytes());
        let mut second = first;

        let mut rng_a = ChaCha8Rng::from_seed([7u8; 32]);
        let mut rng_b = ChaCha8Rng::from_seed([7u8; 32]);
        let size_a = engine.havoc(&mut first, 8, &mut rng_a).unwrap();
        let size_b = engine.havoc(&mut second, 8, &mut rng_b).unwrap();

        assert_eq!(size_a, size_b);
        assert_eq!(first[..size_a], second[..size_b]);
    }

    #[test]
    fn single_byte_buffer_cannot_stall() {
        // Size 1 with no free capacity leaves only the size-preserving
        // operators; the reducer and inserter keep failing or are filtered,
        // and the run must still terminate.
        let engine = HavocEngine::new();
        let mut rng = ChaCha8Rng::from_seed([9u8; 32]);
        for _ in 0..200 {
            let mut buffer = [0x80u8; 1];
            let new_size = engine.havoc(&mut buffer, 1, &mut rng).unwrap();
            assert_eq!(new_size, 1);
        }
    }
}

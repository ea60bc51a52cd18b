//! Uniform selection helpers over a caller-owned random bit generator.
//!
//! Every helper takes `&mut dyn RngCore` so the engine never owns or hides a
//! generator; determinism and thread ownership stay with the caller.

use rand::Rng;
use rand_core::RngCore;

/// Picks a uniform start offset for a `block`-byte window inside a `len`-byte
/// range, so that the window fits entirely within the range.
///
/// # Panics
/// Panics in debug builds if `block > len`.
pub fn block_offset(len: usize, block: usize, rng: &mut dyn RngCore) -> usize {
    debug_assert!(block <= len, "window of {block} bytes cannot fit in {len}");
    rng.random_range(0..=len - block)
}

/// Returns a reference to a uniformly chosen element of a non-empty slice.
pub fn pick<'a, T>(items: &'a [T], rng: &mut dyn RngCore) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Samples one byte uniformly from a non-empty value.
pub fn random_byte(value: &[u8], rng: &mut dyn RngCore) -> u8 {
    *pick(value, rng)
}

/// Draws the number of mutations to stack in one havoc pass.
///
/// The count is `round(2^x)` with `x` uniform in `[0, max_power)`, which for
/// the default power of 5 yields counts in `1..=32` with a geometric bias
/// toward short stacks.
pub fn stacked_count(max_power: f64, rng: &mut dyn RngCore) -> u32 {
    if max_power <= 0.0 {
        return 1;
    }
    let exponent: f64 = rng.random_range(0.0..max_power);
    2f64.powf(exponent).round() as u32
}

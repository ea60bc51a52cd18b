//! The primitive byte-buffer edits stacked by the havoc engine.
//!
//! Every operator has the same shape: it receives the full backing buffer
//! (whose length is the capacity), the current value size, and the caller's
//! generator, and returns the new value size. `None` means the operator could
//! not legally apply to the current bounds; the havoc engine retries with a
//! different draw instead of treating that as an error.

use crate::accessor::{Scalar, ScalarAccessor};
use crate::{interesting, select};
use rand::Rng;
use rand_core::RngCore;
use std::ops::Range;

/// Largest delta applied by the arithmetic operators, matching the AFL
/// lineage's bias toward small perturbations. Tunable.
pub const ARITH_MAX: u64 = 35;

/// How many times the block remover is listed in the havoc set. Shrinking is
/// deliberately more likely than growing so stacked runs keep values compact.
/// Tunable.
const REMOVE_BLOCK_WEIGHT: usize = 2;

/// How a mutation operator affects the value size on success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeEffect {
    /// Writes only within the current value; size is unchanged.
    Preserving,
    /// Needs free capacity; the returned size is strictly larger.
    Increasing,
    /// Needs a value of at least two bytes; the returned size is strictly
    /// smaller but never zero.
    Reducing,
}

/// Signature shared by all mutation operators.
///
/// The slice is the whole backing buffer; `usize` is the current value size.
/// `Some(new_size)` reports success, `None` reports that the bounds cannot
/// satisfy the operator's precondition.
pub type ApplyFn = fn(&mut [u8], usize, &mut dyn RngCore) -> Option<usize>;

/// A named, size-effect-tagged mutation operator.
///
/// Operators are stateless function pointers, so a `MutationOp` is `Copy` and
/// a catalog of them can be filtered and drawn from without any dispatch
/// machinery.
#[derive(Clone, Copy)]
pub struct MutationOp {
    name: &'static str,
    effect: SizeEffect,
    run: ApplyFn,
}

impl MutationOp {
    pub const fn new(name: &'static str, effect: SizeEffect, run: ApplyFn) -> Self {
        Self { name, effect, run }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn effect(&self) -> SizeEffect {
        self.effect
    }

    /// Runs the operator against `buffer[..size]` with `buffer.len()` as the
    /// capacity.
    pub fn apply(&self, buffer: &mut [u8], size: usize, rng: &mut dyn RngCore) -> Option<usize> {
        (self.run)(buffer, size, rng)
    }
}

impl std::fmt::Debug for MutationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationOp")
            .field("name", &self.name)
            .field("effect", &self.effect)
            .finish()
    }
}

/// XORs one uniformly chosen bit of one uniformly chosen value byte.
pub fn flip_bit(buffer: &mut [u8], size: usize, rng: &mut dyn RngCore) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let offset = select::block_offset(size, 1, rng);
    let mut byte: ScalarAccessor<'_, u8> = ScalarAccessor::new(buffer, offset);
    let bit = rng.random_range(0..8u32);
    byte.set(byte.get() ^ (1u8 << bit));
    Some(size)
}

/// Overwrites a random window of the value with a boundary-condition integer.
///
/// The window width is uniform in `[1, min(8, size)]` and the candidate set
/// is the catalog prefix that fits that width, so narrow windows only ever
/// receive values they can represent. The entry's low bytes are written in
/// little-endian order; byte-order coverage comes from the swapped
/// counterparts the catalog already contains.
pub fn interesting_value(buffer: &mut [u8], size: usize, rng: &mut dyn RngCore) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let width = rng.random_range(1..=size.min(8));
    let candidates = interesting::values_up_to_width(width);
    let value = *select::pick(candidates, rng);
    let offset = select::block_offset(size, width, rng);
    buffer[offset..offset + width].copy_from_slice(&value.to_le_bytes()[..width]);
    Some(size)
}

/// Nudges a `T`-wide integer at a random offset by a small delta.
///
/// The delta is uniform in `[1, ARITH_MAX]` and, for multi-byte widths, byte
/// order is swapped with probability one half so the perturbation lands on
/// either encoding of the field. Arithmetic wraps.
fn arithmetic<T: Scalar>(
    buffer: &mut [u8],
    size: usize,
    rng: &mut dyn RngCore,
    subtract: bool,
) -> Option<usize> {
    if size < T::WIDTH {
        return None;
    }
    let mut delta = T::from_u64_lossy(rng.random_range(1..=ARITH_MAX));
    if T::WIDTH >= 2 && rng.random_bool(0.5) {
        delta = delta.swap_bytes();
    }
    let offset = select::block_offset(size, T::WIDTH, rng);
    let mut slot: ScalarAccessor<'_, T> = ScalarAccessor::new(buffer, offset);
    let updated = if subtract {
        slot.get().wrapping_sub(delta)
    } else {
        slot.get().wrapping_add(delta)
    };
    slot.set(updated);
    Some(size)
}

/// Adds a small random delta to a `T`-wide integer in the value.
pub fn arithmetic_add<T: Scalar>(
    buffer: &mut [u8],
    size: usize,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    arithmetic::<T>(buffer, size, rng, false)
}

/// Subtracts a small random delta from a `T`-wide integer in the value.
pub fn arithmetic_sub<T: Scalar>(
    buffer: &mut [u8],
    size: usize,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    arithmetic::<T>(buffer, size, rng, true)
}

/// Replaces one uniformly chosen byte by XORing it with a value in
/// `[1, 255]`, so the written byte always differs from the original.
pub fn random_byte_replace(
    buffer: &mut [u8],
    size: usize,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let offset = select::block_offset(size, 1, rng);
    let mut byte: ScalarAccessor<'_, u8> = ScalarAccessor::new(buffer, offset);
    byte.set(byte.get() ^ rng.random_range(1..=u8::MAX));
    Some(size)
}

/// Removes a random block from the value, closing the gap and zero-filling
/// the vacated tail so a fixed-width field reinterpreting the shrunk region
/// reads zero rather than stale data.
///
/// Never shrinks the value to zero bytes: dropping a whole field is a
/// structural edit that belongs to the schema-aware layer above this engine.
pub fn remove_random_block(
    buffer: &mut [u8],
    size: usize,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    if size <= 1 {
        return None;
    }
    let removed = rng.random_range(1..=size - 1);
    let start = select::block_offset(size, removed, rng);
    buffer.copy_within(start + removed..size, start);
    let new_size = size - removed;
    buffer[new_size..size].fill(0);
    Some(new_size)
}

/// Inserts a random-length block at a random offset, shifting the tail right
/// into scratch space and filling the gap with the clone-or-repeat policy.
pub fn random_block_insert(
    buffer: &mut [u8],
    size: usize,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    let capacity = buffer.len();
    if capacity <= size {
        return None;
    }
    let inserted = rng.random_range(1..=capacity - size);
    let offset = rng.random_range(0..=size);
    buffer.copy_within(offset..size, offset + inserted);
    let new_size = size + inserted;
    clone_or_repeat(&mut buffer[..new_size], offset..offset + inserted, rng);
    Some(new_size)
}

/// Overwrites a random block of the value in place using the clone-or-repeat
/// policy.
pub fn random_chunk_overwrite(
    buffer: &mut [u8],
    size: usize,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let block = rng.random_range(1..=size);
    let start = select::block_offset(size, block, rng);
    clone_or_repeat(&mut buffer[..size], start..start + block, rng);
    Some(size)
}

/// Fills `dest` within `value` either by cloning another window of the value
/// (probability 3/4) or by repeating a single byte, itself sampled from the
/// value or drawn fresh with equal probability.
///
/// Cloning requires the value to extend beyond the destination; when `dest`
/// covers the whole value there is no other window to copy from and the
/// repeated-byte fill is used. `copy_within` keeps overlapping clones safe.
fn clone_or_repeat(value: &mut [u8], dest: Range<usize>, rng: &mut dyn RngCore) {
    let block = dest.len();
    let can_clone = value.len() > block;
    if can_clone && rng.random_range(0..4u32) != 0 {
        let source = select::block_offset(value.len(), block, rng);
        value.copy_within(source..source + block, dest.start);
    } else {
        let fill = if rng.random_bool(0.5) {
            select::random_byte(value, rng)
        } else {
            rng.random::<u8>()
        };
        value[dest].fill(fill);
    }
}

/// Returns the operator catalog used by the havoc engine.
///
/// Per-width arithmetic entries and the doubled block remover reproduce the
/// historical weighting: arithmetic nudges are drawn often, and shrinking is
/// twice as likely as any single other edit so generated values trend
/// compact.
pub fn havoc_set() -> Vec<MutationOp> {
    let mut ops = vec![
        MutationOp::new("flip-bit", SizeEffect::Preserving, flip_bit),
        MutationOp::new("interesting-value", SizeEffect::Preserving, interesting_value),
        MutationOp::new("arith-add-u8", SizeEffect::Preserving, arithmetic_add::<u8>),
        MutationOp::new("arith-add-u16", SizeEffect::Preserving, arithmetic_add::<u16>),
        MutationOp::new("arith-add-u32", SizeEffect::Preserving, arithmetic_add::<u32>),
        MutationOp::new("arith-add-u64", SizeEffect::Preserving, arithmetic_add::<u64>),
        MutationOp::new("arith-sub-u8", SizeEffect::Preserving, arithmetic_sub::<u8>),
        MutationOp::new("arith-sub-u16", SizeEffect::Preserving, arithmetic_sub::<u16>),
        MutationOp::new("arith-sub-u32", SizeEffect::Preserving, arithmetic_sub::<u32>),
        MutationOp::new("arith-sub-u64", SizeEffect::Preserving, arithmetic_sub::<u64>),
        MutationOp::new("byte-replace", SizeEffect::Preserving, random_byte_replace),
        MutationOp::new("chunk-overwrite", SizeEffect::Preserving, random_chunk_overwrite),
        MutationOp::new("block-insert", SizeEffect::Increasing, random_block_insert),
    ];
    for _ in 0..REMOVE_BLOCK_WEIGHT {
        ops.push(MutationOp::new(
            "remove-block",
            SizeEffect::Reducing,
            remove_random_block,
        ));
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    fn rng(seed: u8) -> ChaCha8Rng {
        ChaCha8Rng::from_seed([seed; 32])
    }

    #[test]
    fn flip_bit_changes_exactly_one_bit() {
        let mut rng = rng(1);
        for _ in 0..200 {
            let mut buffer = [0x5Au8; 6];
            let before = buffer;
            let size = flip_bit(&mut buffer, 6, &mut rng).unwrap();
            assert_eq!(size, 6);
            let flipped: u32 = buffer
                .iter()
                .zip(before.iter())
                .map(|(a, b)| (a ^ b).count_ones())
                .sum();
            assert_eq!(flipped, 1);
        }
    }

    #[test]
    fn flip_bit_rejects_empty_value() {
        let mut rng = rng(2);
        let mut buffer = [0u8; 4];
        assert_eq!(flip_bit(&mut buffer, 0, &mut rng), None);
    }

    #[test]
    fn interesting_value_writes_only_within_the_value() {
        let mut rng = rng(3);
        for _ in 0..500 {
            let mut buffer = [0xAAu8; 12];
            let size = interesting_value(&mut buffer, 5, &mut rng).unwrap();
            assert_eq!(size, 5);
            assert!(buffer[5..].iter().all(|&b| b == 0xAA));
        }
    }

    #[test]
    fn interesting_value_on_single_byte_uses_narrow_entries() {
        let mut rng = rng(4);
        let narrow = crate::interesting::values_up_to_width(1);
        for _ in 0..200 {
            let mut buffer = [0u8; 1];
            interesting_value(&mut buffer, 1, &mut rng).unwrap();
            assert!(narrow.contains(&(buffer[0] as u64)));
        }
    }

    #[test]
    fn arithmetic_respects_width_precondition() {
        let mut rng = rng(5);
        let mut buffer = [0u8; 8];
        assert_eq!(arithmetic_add::<u64>(&mut buffer, 7, &mut rng), None);
        assert_eq!(arithmetic_sub::<u32>(&mut buffer, 3, &mut rng), None);
        assert!(arithmetic_add::<u32>(&mut buffer, 4, &mut rng).is_some());
    }

    #[test]
    fn arithmetic_add_then_sub_round_trips_with_forced_draws() {
        // A width-1 delta has no endian branch, so add and sub with the same
        // delta and offset must cancel. Replay the same seed for both calls.
        let mut buffer = [100u8; 1];
        arithmetic_add::<u8>(&mut buffer, 1, &mut rng(6)).unwrap();
        let bumped = buffer[0];
        assert_ne!(bumped, 100);
        arithmetic_sub::<u8>(&mut buffer, 1, &mut rng(6)).unwrap();
        assert_eq!(buffer[0], 100);
    }

    #[test]
    fn byte_replace_never_leaves_the_byte_unchanged() {
        let mut rng = rng(7);
        for _ in 0..1000 {
            let mut buffer = [0x42u8; 3];
            let before = buffer;
            random_byte_replace(&mut buffer, 3, &mut rng).unwrap();
            let changed = buffer.iter().zip(before.iter()).filter(|(a, b)| a != b).count();
            assert_eq!(changed, 1, "exactly one byte must change, and it must change");
        }
    }

    #[test]
    fn remove_block_zero_fills_the_vacated_tail() {
        let mut rng = rng(8);
        for _ in 0..500 {
            let mut buffer = [0xFFu8; 10];
            let new_size = remove_random_block(&mut buffer, 10, &mut rng).unwrap();
            assert!((1..10).contains(&new_size));
            assert!(buffer[new_size..10].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn remove_block_requires_at_least_two_bytes() {
        let mut rng = rng(9);
        let mut buffer = [1u8; 4];
        assert_eq!(remove_random_block(&mut buffer, 0, &mut rng), None);
        assert_eq!(remove_random_block(&mut buffer, 1, &mut rng), None);
    }

    #[test]
    fn remove_block_closes_the_gap() {
        // Removing from a strictly increasing sequence must leave a
        // subsequence of the original followed by zeros.
        let mut rng = rng(10);
        for _ in 0..200 {
            let mut buffer: [u8; 8] = std::array::from_fn(|i| i as u8 + 1);
            let new_size = remove_random_block(&mut buffer, 8, &mut rng).unwrap();
            assert!(buffer[..new_size].windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn block_insert_needs_free_capacity() {
        let mut rng = rng(11);
        let mut buffer = [0u8; 4];
        assert_eq!(random_block_insert(&mut buffer, 4, &mut rng), None);
    }

    #[test]
    fn block_insert_grows_within_capacity() {
        let mut rng = rng(12);
        for _ in 0..500 {
            let mut buffer = [0u8; 10];
            buffer[..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
            let new_size = random_block_insert(&mut buffer, 4, &mut rng).unwrap();
            assert!(new_size > 4 && new_size <= 10);
        }
    }

    #[test]
    fn block_insert_on_empty_value_produces_data() {
        let mut rng = rng(13);
        for _ in 0..100 {
            let mut buffer = [0u8; 6];
            let new_size = random_block_insert(&mut buffer, 0, &mut rng).unwrap();
            assert!((1..=6).contains(&new_size));
        }
    }

    #[test]
    fn chunk_overwrite_preserves_size_and_bounds() {
        let mut rng = rng(14);
        for _ in 0..500 {
            let mut buffer = [0x11u8; 9];
            let size = random_chunk_overwrite(&mut buffer, 7, &mut rng).unwrap();
            assert_eq!(size, 7);
            assert!(buffer[7..].iter().all(|&b| b == 0x11));
        }
    }

    #[test]
    fn havoc_set_lists_the_expected_weights() {
        let ops = havoc_set();
        let removers = ops.iter().filter(|op| op.name() == "remove-block").count();
        assert_eq!(removers, REMOVE_BLOCK_WEIGHT);
        let increasing = ops
            .iter()
            .filter(|op| op.effect() == SizeEffect::Increasing)
            .count();
        assert_eq!(increasing, 1);
        assert!(ops.iter().any(|op| op.effect() == SizeEffect::Reducing));
    }

    #[test]
    fn declared_categories_match_observed_effects() {
        let mut rng = rng(15);
        for op in havoc_set() {
            for _ in 0..200 {
                let mut buffer = [0xC3u8; 16];
                let size = 12;
                let Some(new_size) = op.apply(&mut buffer, size, &mut rng) else {
                    continue;
                };
                match op.effect() {
                    SizeEffect::Preserving => assert_eq!(new_size, size, "{}", op.name()),
                    SizeEffect::Increasing => {
                        assert!(new_size > size && new_size <= 16, "{}", op.name())
                    }
                    SizeEffect::Reducing => assert!(new_size < size, "{}", op.name()),
                }
            }
        }
    }
}

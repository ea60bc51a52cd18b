//! Precomputed catalog of boundary-condition integers.
//!
//! The generating sets are the AFL lineage's "interesting" values: the signed
//! min/max of each width, their off-by-one neighbors, and a few power-of-two
//! neighborhoods. Interesting-value substitution has a 50-50 chance of using
//! either byte order, so every entry is inserted together with its
//! byte-order-swapped counterpart up front instead of swapping at mutation
//! time. The catalog is built once, sorted and deduplicated, and shared
//! read-only across all engine instances.

use crate::accessor::Scalar;
use std::sync::LazyLock;

const INTERESTING_8: [i8; 8] = [i8::MIN, -1, 0, 1, 16, 32, 100, i8::MAX];

const INTERESTING_16: [i16; 11] = [
    i16::MIN,
    (i8::MIN as i16) - 1,
    -1,
    (i8::MAX as i16) + 1,
    u8::MAX as i16,
    (u8::MAX as i16) + 1,
    1 << 9,
    1000,
    1 << 10,
    1 << 12,
    i16::MAX,
];

const INTERESTING_32: [i32; 9] = [
    i32::MIN,
    -100_663_046, // Large negative number, same in either byte order.
    (i16::MIN as i32) - 1,
    -1,
    (i16::MAX as i32) + 1,
    u16::MAX as i32,
    (u16::MAX as i32) + 1,
    100_663_045, // Large positive number, same in either byte order.
    i32::MAX,
];

const INTERESTING_64: [i64; 7] = [
    i64::MIN,
    (i32::MIN as i64) - 1,
    -1,
    (i32::MAX as i64) + 1,
    u32::MAX as i64,
    (u32::MAX as i64) + 1,
    i64::MAX,
];

static CATALOG: LazyLock<Vec<u64>> = LazyLock::new(build_catalog);

/// Appends each source value and its byte-order-swapped counterpart,
/// reinterpreted as unsigned at its native width and zero-extended to 64 bits.
fn extend_with_swapped<T: Scalar + Into<u64>>(values: &mut Vec<u64>, source: &[T]) {
    values.reserve(source.len() * 2);
    for &value in source {
        values.push(value.into());
        values.push(value.swap_bytes().into());
    }
}

fn build_catalog() -> Vec<u64> {
    let mut values = Vec::new();
    extend_with_swapped(&mut values, &INTERESTING_8.map(|v| v as u8));
    extend_with_swapped(&mut values, &INTERESTING_16.map(|v| v as u16));
    extend_with_swapped(&mut values, &INTERESTING_32.map(|v| v as u32));
    extend_with_swapped(&mut values, &INTERESTING_64.map(|v| v as u64));
    values.sort_unstable();
    values.dedup();
    values
}

/// Returns the full sorted, deduplicated catalog.
pub fn all() -> &'static [u64] {
    &CATALOG
}

/// Returns the largest value an unsigned integer of `width` bytes can hold.
/// Widths of 8 or more saturate to `u64::MAX`.
pub fn max_for_width(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// Returns the catalog prefix whose entries fit in an unsigned integer of
/// `width` bytes.
///
/// Because the catalog is sorted ascending, one upper-bound search serves
/// every width; smaller widths see shorter prefixes, which naturally keeps
/// large-magnitude entries out of narrow substitutions.
pub fn values_up_to_width(width: usize) -> &'static [u64] {
    debug_assert!((1..=8).contains(&width));
    let bound = max_for_width(width);
    let end = CATALOG.partition_point(|&value| value <= bound);
    &CATALOG[..end]
}

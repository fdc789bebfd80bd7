//! Slot Hashing
//!
//! Tile keys vary slowly in their origin bits, so they are run through a
//! 32-bit avalanche finalizer before being reduced to a slot.

use crate::key::TileKey;

/// 32-bit finalizer mix. Pure and deterministic.
#[inline]
pub fn hash32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x85eb_ca6b);
    x ^= x >> 13;
    x = x.wrapping_mul(0xc2b2_ae35);
    x ^= x >> 16;
    x
}

/// Candidate slot for `key` in a subtable of `cache_size` entries seeded with `seed`
#[inline]
pub fn slot(key: &TileKey, seed: u32, cache_size: usize) -> usize {
    debug_assert!(cache_size > 0);
    (hash32(key.pack()) ^ seed) as usize % cache_size
}

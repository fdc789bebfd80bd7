//! LOD Resolver
//!
//! Starting from the desired fractional level `d`, two independent linear
//! searches look for resident tiles: downward from `floor(d)` to the range
//! minimum and upward from `ceil(d)` to the range maximum. Each stops at the
//! first level whose tile is found in the cache index.

use bitflags::bitflags;
use glam::Vec2;
use virtex_core::key::MAX_ORIGIN;
use virtex_core::math::inverse_lerp;
use virtex_core::{LodRange, Rect, TileKey};
use virtex_index::{CacheIndex, SubtableId};

bitflags! {
    /// Which of the two searches found a resident tile
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SearchOutcome: u8 {
        const LOWER = 1 << 0;
        const UPPER = 1 << 1;
    }
}

/// A resident tile found by one of the searches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Found {
    /// Key of the resident tile
    pub key: TileKey,
    /// Atlas region of the tile
    pub region: Rect,
    /// Subtable the entry was found in
    pub subtable: SubtableId,
    /// Sample position inside the tile, in `[0, 1)²`
    pub local: Vec2,
}

impl Found {
    #[inline]
    pub fn level(&self) -> i32 {
        self.key.level()
    }

    /// Normalized atlas coordinate of the sample
    #[inline]
    pub fn atlas_coord(&self) -> Vec2 {
        self.region.lerp(self.local)
    }
}

/// Result of both searches for one query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Desired level after clamping into the range
    pub desired: f32,
    /// Nearest resident level at or below `floor(desired)`
    pub lower: Option<Found>,
    /// Nearest resident level at or above `ceil(desired)`
    pub upper: Option<Found>,
}

impl Resolution {
    pub fn outcome(&self) -> SearchOutcome {
        let mut outcome = SearchOutcome::empty();
        outcome.set(SearchOutcome::LOWER, self.lower.is_some());
        outcome.set(SearchOutcome::UPPER, self.upper.is_some());
        outcome
    }

    /// Blend weight of the upper sample; 0 when only one level is involved
    pub fn blend_factor(&self) -> f32 {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) if upper.level() != lower.level() => {
                inverse_lerp(lower.level() as f32, upper.level() as f32, self.desired)
            }
            _ => 0.0,
        }
    }
}

/// Key and tile-local coordinate of the tile covering `coord` at `level`.
///
/// `None` when the tile's origin is negative, non-finite or too large to
/// encode; callers treat that like a miss.
pub fn tile_at(coord: Vec2, level: i32) -> Option<(TileKey, Vec2)> {
    let scaled = coord * (level as f32).exp2();
    let origin = scaled.floor();
    let max = MAX_ORIGIN as f32;
    // NaN fails every comparison and lands here too
    if !(origin.x >= 0.0 && origin.y >= 0.0 && origin.x <= max && origin.y <= max) {
        return None;
    }
    let key = TileKey::new(origin.as_uvec2(), level).ok()?;
    Some((key, scaled - origin))
}

/// Look up the tile covering `coord` at a single level
#[inline]
pub fn find_at(index: &CacheIndex, coord: Vec2, level: i32) -> Option<Found> {
    let (key, local) = tile_at(coord, level)?;
    let (entry, subtable) = index.lookup_either(&key)?;
    Some(Found {
        key,
        region: entry.region,
        subtable,
        local,
    })
}

/// Run both searches. At most `max - min + 1` lookups happen per direction.
pub fn resolve_levels(index: &CacheIndex, coord: Vec2, desired: f32, range: &LodRange) -> Resolution {
    let desired = range.clamp(desired);
    let lower_start = range.clamp_level(desired.floor() as i32);
    let upper_start = range.clamp_level(desired.ceil() as i32);

    let lower = (range.min()..=lower_start)
        .rev()
        .find_map(|level| find_at(index, coord, level));
    let upper = (upper_start..=range.max()).find_map(|level| find_at(index, coord, level));

    Resolution { desired, lower, upper }
}

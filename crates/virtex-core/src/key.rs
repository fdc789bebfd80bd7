//! Tile Keys
//!
//! A tile is identified by its origin in the tile grid of its own mip level
//! and by that level. Keys pack into a single `u32`:
//!
//! ```text
//! 31          19 18          6 5    0
//! | y (13 bits) | x (13 bits) | level |
//! ```

use std::fmt;

use glam::UVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bits reserved for the mip level
pub const LEVEL_BITS: u32 = 6;
/// Bits reserved for each origin component
pub const ORIGIN_BITS: u32 = 13;
/// Highest encodable mip level
pub const MAX_LEVEL: i32 = (1 << LEVEL_BITS) - 1;
/// Highest encodable origin component
pub const MAX_ORIGIN: u32 = (1 << ORIGIN_BITS) - 1;

const LEVEL_MASK: u32 = (1 << LEVEL_BITS) - 1;
const ORIGIN_MASK: u32 = (1 << ORIGIN_BITS) - 1;
const X_SHIFT: u32 = LEVEL_BITS;
const Y_SHIFT: u32 = LEVEL_BITS + ORIGIN_BITS;

/// Key construction errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    #[error("tile origin ({x}, {y}) exceeds the 13-bit range")]
    OriginOutOfRange { x: u32, y: u32 },

    #[error("mip level {0} is outside 0..=63")]
    LevelOutOfRange(i32),
}

/// Result type for key construction
pub type KeyResult<T> = Result<T, KeyError>;

/// Identifies one tile of the virtual texture at one mip level.
///
/// Keys can only be built through [`TileKey::new`], which rejects origins
/// and levels that do not fit the packed layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTileKey", into = "RawTileKey")]
pub struct TileKey {
    origin: UVec2,
    level: i32,
}

impl TileKey {
    /// Create a key, validating that it fits the packed layout
    pub fn new(origin: UVec2, level: i32) -> KeyResult<Self> {
        if origin.x > MAX_ORIGIN || origin.y > MAX_ORIGIN {
            return Err(KeyError::OriginOutOfRange { x: origin.x, y: origin.y });
        }
        if !(0..=MAX_LEVEL).contains(&level) {
            return Err(KeyError::LevelOutOfRange(level));
        }
        Ok(Self { origin, level })
    }

    /// Tile-grid origin at this key's level
    #[inline]
    pub fn origin(&self) -> UVec2 {
        self.origin
    }

    /// Mip level
    #[inline]
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Pack into the 32-bit descriptor used for hashing and upload
    #[inline]
    pub fn pack(&self) -> u32 {
        (self.origin.y << Y_SHIFT) | (self.origin.x << X_SHIFT) | (self.level as u32 & LEVEL_MASK)
    }

    /// Rebuild a key from a packed descriptor. Every `u32` decodes to a valid key.
    pub fn unpack(packed: u32) -> Self {
        Self {
            origin: UVec2::new((packed >> X_SHIFT) & ORIGIN_MASK, packed >> Y_SHIFT),
            level: (packed & LEVEL_MASK) as i32,
        }
    }
}

/// Validate and pack in one step
pub fn pack(origin: UVec2, level: i32) -> KeyResult<u32> {
    TileKey::new(origin, level).map(|key| key.pack())
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})@{}", self.origin.x, self.origin.y, self.level)
    }
}

/// Unvalidated serde mirror of [`TileKey`]
#[derive(Serialize, Deserialize)]
struct RawTileKey {
    x: u32,
    y: u32,
    level: i32,
}

impl TryFrom<RawTileKey> for TileKey {
    type Error = KeyError;

    fn try_from(raw: RawTileKey) -> KeyResult<Self> {
        TileKey::new(UVec2::new(raw.x, raw.y), raw.level)
    }
}

impl From<TileKey> for RawTileKey {
    fn from(key: TileKey) -> Self {
        Self { x: key.origin.x, y: key.origin.y, level: key.level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let key = TileKey::new(UVec2::new(3, 3), 2).unwrap();
        assert_eq!(key.pack(), (3 << 19) | (3 << 6) | 2);

        let key = TileKey::new(UVec2::new(MAX_ORIGIN, MAX_ORIGIN), MAX_LEVEL).unwrap();
        assert_eq!(key.pack(), u32::MAX);

        let key = TileKey::new(UVec2::ZERO, 0).unwrap();
        assert_eq!(key.pack(), 0);
    }

    #[test]
    fn test_unpack_inverts_pack() {
        let key = TileKey::new(UVec2::new(4095, 17), 9).unwrap();
        assert_eq!(TileKey::unpack(key.pack()), key);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            TileKey::new(UVec2::new(1 << 13, 0), 0),
            Err(KeyError::OriginOutOfRange { x: 8192, y: 0 })
        );
        assert!(TileKey::new(UVec2::new(0, 1 << 13), 0).is_err());
        assert_eq!(TileKey::new(UVec2::ZERO, 64), Err(KeyError::LevelOutOfRange(64)));
        assert_eq!(TileKey::new(UVec2::ZERO, -1), Err(KeyError::LevelOutOfRange(-1)));
        assert!(pack(UVec2::new(9000, 0), 1).is_err());
    }

    #[test]
    fn test_equality_ignores_nothing() {
        let a = TileKey::new(UVec2::new(1, 2), 3).unwrap();
        let b = TileKey::new(UVec2::new(1, 2), 4).unwrap();
        let c = TileKey::new(UVec2::new(2, 1), 3).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, TileKey::new(UVec2::new(1, 2), 3).unwrap());
    }

    #[test]
    fn test_serde_validates() {
        let key = TileKey::new(UVec2::new(5, 6), 7).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"x":5,"y":6,"level":7}"#);
        assert_eq!(serde_json::from_str::<TileKey>(&json).unwrap(), key);

        assert!(serde_json::from_str::<TileKey>(r#"{"x":5,"y":6,"level":70}"#).is_err());
    }

    #[test]
    fn test_display() {
        let key = TileKey::new(UVec2::new(5, 6), 7).unwrap();
        assert_eq!(key.to_string(), "(5, 6)@7");
    }
}

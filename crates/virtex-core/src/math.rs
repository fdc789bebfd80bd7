//! Math utilities
//!
//! Re-exports from glam plus the small value types shared by the index and
//! the sampler: atlas rectangles, colors and mip level ranges.

pub use glam::{UVec2, Vec2, Vec4};

use serde::{Deserialize, Serialize};

use crate::key::MAX_LEVEL;
use crate::{CoreError, CoreResult};

/// Axis-aligned rectangle in normalized atlas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Rect {
    /// Create a rectangle from min and max corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create a rectangle from an origin and a size
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    /// Get the full size of the rectangle
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Map a rectangle-local coordinate in `[0, 1]²` to a position inside the rectangle
    #[inline]
    pub fn lerp(&self, local: Vec2) -> Vec2 {
        self.min + self.size() * local
    }

    /// Check that both corners are finite
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color(pub Vec4);

impl Color {
    pub const TRANSPARENT: Self = Self(Vec4::ZERO);
    pub const BLACK: Self = Self(Vec4::new(0.0, 0.0, 0.0, 1.0));
    pub const WHITE: Self = Self(Vec4::ONE);

    /// Create a color from its components
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self(Vec4::new(r, g, b, a))
    }

    /// Convert to 8-bit components, clamping out-of-range channels
    pub fn to_rgba8(self) -> [u8; 4] {
        let c = (self.0.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
        [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
    }

    /// Linear interpolation towards `other`
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self(self.0.lerp(other.0, t))
    }

    /// Component-wise approximate equality
    pub fn abs_diff_eq(self, other: Self, max_abs_diff: f32) -> bool {
        self.0.abs_diff_eq(other.0, max_abs_diff)
    }
}

/// Inclusive range of valid mip levels for one texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(i32, i32)", into = "(i32, i32)")]
pub struct LodRange {
    min: i32,
    max: i32,
}

impl LodRange {
    /// Create a range; requires `0 <= min <= max <= MAX_LEVEL`
    pub fn new(min: i32, max: i32) -> CoreResult<Self> {
        if min > max || min < 0 || max > MAX_LEVEL {
            return Err(CoreError::InvalidLodRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lowest valid level
    #[inline]
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Highest valid level
    #[inline]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Clamp a fractional level into the range. NaN clamps to `min`.
    pub fn clamp(&self, level: f32) -> f32 {
        if level.is_nan() {
            return self.min as f32;
        }
        level.clamp(self.min as f32, self.max as f32)
    }

    /// Clamp an integer level into the range
    pub fn clamp_level(&self, level: i32) -> i32 {
        level.clamp(self.min, self.max)
    }
}

impl TryFrom<(i32, i32)> for LodRange {
    type Error = CoreError;

    fn try_from((min, max): (i32, i32)) -> CoreResult<Self> {
        Self::new(min, max)
    }
}

impl From<LodRange> for (i32, i32) {
    fn from(range: LodRange) -> Self {
        (range.min, range.max)
    }
}

/// Inverse linear interpolation
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        0.0
    } else {
        (value - a) / (b - a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_lerp() {
        let rect = Rect::new(Vec2::new(0.25, 0.5), Vec2::new(0.75, 1.0));
        assert_eq!(rect.lerp(Vec2::ZERO), rect.min);
        assert_eq!(rect.lerp(Vec2::ONE), rect.max);
        assert_eq!(rect.lerp(Vec2::splat(0.5)), Vec2::new(0.5, 0.75));
        assert_eq!(rect.size(), Vec2::splat(0.5));
    }

    #[test]
    fn test_rect_is_finite() {
        assert!(Rect::from_origin_size(Vec2::ZERO, Vec2::splat(0.5)).is_finite());
        assert!(!Rect::new(Vec2::ZERO, Vec2::new(f32::INFINITY, 1.0)).is_finite());
        assert!(!Rect::new(Vec2::new(0.0, f32::NAN), Vec2::ONE).is_finite());
    }

    #[test]
    fn test_color_lerp_endpoints() {
        let a = Color::new(1.0, 0.0, 0.0, 1.0);
        let b = Color::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert!(a.lerp(b, 0.5).abs_diff_eq(Color::new(0.5, 0.0, 0.5, 1.0), 1e-6));
    }

    #[test]
    fn test_color_rgba8() {
        assert_eq!(Color::WHITE.to_rgba8(), [255; 4]);
        assert_eq!(Color::new(2.0, -1.0, 0.5, 1.0).to_rgba8(), [255, 0, 128, 255]);
    }

    #[test]
    fn test_lod_range() {
        let range = LodRange::new(2, 5).unwrap();
        assert_eq!((range.min(), range.max()), (2, 5));
        assert_eq!(range.clamp(7.5), 5.0);
        assert_eq!(range.clamp(-1.0), 2.0);
        assert_eq!(range.clamp(f32::NAN), 2.0);
        assert_eq!(range.clamp(f32::INFINITY), 5.0);
        assert_eq!(range.clamp_level(0), 2);
    }

    #[test]
    fn test_lod_range_rejects_invalid() {
        assert!(LodRange::new(3, 2).is_err());
        assert!(LodRange::new(-1, 2).is_err());
        assert!(LodRange::new(0, 64).is_err());
        assert!(LodRange::new(4, 4).is_ok());
    }

    #[test]
    fn test_inverse_lerp() {
        assert_eq!(inverse_lerp(2.0, 4.0, 3.0), 0.5);
        assert_eq!(inverse_lerp(1.0, 1.0, 3.0), 0.0);
    }
}

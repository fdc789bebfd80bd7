//! Sample Compositor
//!
//! Turns a [`Resolution`] into a color: blends when both searches hit
//! different levels, passes a single hit through, and falls back to the
//! background color on a total miss.

use virtex_core::Color;

use crate::atlas::AtlasSource;
use crate::resolver::{Found, Resolution};

/// Final result of one query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedSample {
    /// Two distinct levels blended with weight `t` on the upper one
    Blended {
        lower: i32,
        upper: i32,
        t: f32,
        color: Color,
    },
    /// One level sampled unmodified
    Single { level: i32, color: Color },
    /// Nothing resident anywhere in the range
    Miss { color: Color },
}

impl ResolvedSample {
    #[inline]
    pub fn color(&self) -> Color {
        match *self {
            Self::Blended { color, .. } | Self::Single { color, .. } | Self::Miss { color } => color,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Self::Miss { .. })
    }

    /// The sampled level, or the lower one for a blend
    pub fn level(&self) -> Option<i32> {
        match *self {
            Self::Blended { lower, .. } => Some(lower),
            Self::Single { level, .. } => Some(level),
            Self::Miss { .. } => None,
        }
    }
}

/// Read a found tile from the atlas
#[inline]
pub fn sample_found<A: AtlasSource + ?Sized>(found: &Found, atlas: &A) -> Color {
    atlas.read(found.atlas_coord())
}

pub fn composite<A: AtlasSource + ?Sized>(
    resolution: &Resolution,
    atlas: &A,
    background: Color,
) -> ResolvedSample {
    match (&resolution.lower, &resolution.upper) {
        (Some(lower), Some(upper)) if lower.level() != upper.level() => {
            let t = resolution.blend_factor();
            let color = sample_found(lower, atlas).lerp(sample_found(upper, atlas), t);
            ResolvedSample::Blended {
                lower: lower.level(),
                upper: upper.level(),
                t,
                color,
            }
        }
        (Some(found), _) | (None, Some(found)) => ResolvedSample::Single {
            level: found.level(),
            color: sample_found(found, atlas),
        },
        (None, None) => ResolvedSample::Miss { color: background },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::FnAtlas;
    use glam::{UVec2, Vec2};
    use virtex_core::{Rect, TileKey};
    use virtex_index::SubtableId;

    /// Atlas whose red channel is the horizontal atlas coordinate
    fn gradient() -> FnAtlas<impl Fn(Vec2) -> Color + Sync> {
        FnAtlas(|uv: Vec2| Color::new(uv.x, 0.0, 0.0, 1.0))
    }

    fn found(level: i32, region_x: f32) -> Found {
        Found {
            key: TileKey::new(UVec2::ZERO, level).unwrap(),
            region: Rect::new(Vec2::new(region_x, 0.0), Vec2::new(region_x, 1.0)),
            subtable: SubtableId::A,
            local: Vec2::splat(0.5),
        }
    }

    fn resolution(desired: f32, lower: Option<Found>, upper: Option<Found>) -> Resolution {
        Resolution {
            desired,
            lower,
            upper,
        }
    }

    #[test]
    fn test_blend_weights() {
        let atlas = gradient();
        let r = resolution(2.25, Some(found(2, 0.2)), Some(found(3, 0.6)));
        let sample = composite(&r, &atlas, Color::TRANSPARENT);
        match sample {
            ResolvedSample::Blended { lower, upper, t, color } => {
                assert_eq!((lower, upper), (2, 3));
                assert_eq!(t, 0.25);
                assert!((color.0.x - 0.3).abs() < 1e-6);
            }
            other => panic!("expected blend, got {:?}", other),
        }
    }

    #[test]
    fn test_blend_boundaries() {
        let atlas = gradient();
        let lower = found(1, 0.2);
        let upper = found(3, 0.6);

        let at_lower = composite(&resolution(1.0, Some(lower), Some(upper)), &atlas, Color::TRANSPARENT);
        assert!(at_lower.color().abs_diff_eq(sample_found(&lower, &atlas), 1e-6));

        let at_upper = composite(&resolution(3.0, Some(lower), Some(upper)), &atlas, Color::TRANSPARENT);
        assert!(at_upper.color().abs_diff_eq(sample_found(&upper, &atlas), 1e-6));
    }

    #[test]
    fn test_equal_levels_are_single() {
        let atlas = gradient();
        let f = found(2, 0.4);
        let sample = composite(&resolution(2.0, Some(f), Some(f)), &atlas, Color::TRANSPARENT);
        assert_eq!(sample, ResolvedSample::Single { level: 2, color: Color::new(0.4, 0.0, 0.0, 1.0) });
    }

    #[test]
    fn test_single_side_passes_through() {
        let atlas = gradient();
        let lower_only = composite(&resolution(2.5, Some(found(0, 0.1)), None), &atlas, Color::BLACK);
        assert_eq!(lower_only.level(), Some(0));
        assert!(lower_only.color().abs_diff_eq(Color::new(0.1, 0.0, 0.0, 1.0), 1e-6));

        let upper_only = composite(&resolution(2.5, None, Some(found(5, 0.9))), &atlas, Color::BLACK);
        assert_eq!(upper_only.level(), Some(5));
        assert!(upper_only.is_found());
    }

    #[test]
    fn test_total_miss_is_background() {
        let atlas = gradient();
        let background = Color::new(0.1, 0.2, 0.3, 1.0);
        let sample = composite(&resolution(2.5, None, None), &atlas, background);
        assert_eq!(sample, ResolvedSample::Miss { color: background });
        assert!(!sample.is_found());
        assert_eq!(sample.level(), None);
    }
}

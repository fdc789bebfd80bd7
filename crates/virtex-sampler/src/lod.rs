//! LOD Estimation
//!
//! Sample coordinates are expressed in level-0 tile units. Level `L` splits
//! each level-0 tile into `2^L × 2^L` tiles, so a magnified footprint (small
//! coordinate derivatives) asks for a higher level.

use glam::Vec2;
use virtex_core::LodRange;

/// Screen-space derivatives of the sample coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Derivatives {
    /// d(coord)/dx
    pub ddx: Vec2,
    /// d(coord)/dy
    pub ddy: Vec2,
}

impl Derivatives {
    pub fn new(ddx: Vec2, ddy: Vec2) -> Self {
        Self { ddx, ddy }
    }

    /// Isotropic footprint of `size` coordinate units per pixel
    pub fn isotropic(size: f32) -> Self {
        Self {
            ddx: Vec2::new(size, 0.0),
            ddy: Vec2::new(0.0, size),
        }
    }
}

/// How a query specifies its desired level
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LodInput {
    /// Estimate from derivatives; the context's bias applies
    Derivatives(Derivatives),
    /// Use this fractional level as is
    Level(f32),
}

/// `-0.5 * log2(max(|ddx|², |ddy|²))`.
///
/// A zero footprint gives `+inf`, which the range clamp turns into the
/// highest level.
pub fn level_estimate(derivatives: &Derivatives) -> f32 {
    let footprint = derivatives
        .ddx
        .length_squared()
        .max(derivatives.ddy.length_squared());
    -0.5 * footprint.log2()
}

/// Bias an estimate and clamp it into `range`
pub fn desired_level(estimate: f32, bias: f32, range: &LodRange) -> f32 {
    range.clamp(estimate + bias)
}

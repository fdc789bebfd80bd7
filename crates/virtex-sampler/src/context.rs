//! Resolve Context
//!
//! Everything a query needs besides its own coordinate, passed explicitly.

use glam::Vec2;
use virtex_core::{Color, CoreResult, LodRange, VirtualTextureConfig};
use virtex_index::CacheIndex;

use crate::atlas::AtlasSource;
use crate::compositor::{composite, ResolvedSample};
use crate::lod::{desired_level, level_estimate, Derivatives, LodInput};
use crate::resolver::{resolve_levels, Resolution};

/// One sample request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleQuery {
    /// Coordinate in level-0 tile units
    pub coord: Vec2,
    pub lod: LodInput,
}

impl SampleQuery {
    pub fn with_derivatives(coord: Vec2, derivatives: Derivatives) -> Self {
        Self {
            coord,
            lod: LodInput::Derivatives(derivatives),
        }
    }

    pub fn at_level(coord: Vec2, level: f32) -> Self {
        Self {
            coord,
            lod: LodInput::Level(level),
        }
    }
}

/// Read-only inputs shared by every query of a pass
pub struct ResolveContext<'a, A: AtlasSource + ?Sized> {
    pub index: &'a CacheIndex,
    pub atlas: &'a A,
    pub range: LodRange,
    pub lod_bias: f32,
    pub background: Color,
}

// Manual impls: a derive would require `A: Clone`.
impl<A: AtlasSource + ?Sized> Clone for ResolveContext<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: AtlasSource + ?Sized> Copy for ResolveContext<'_, A> {}

impl<'a, A: AtlasSource + ?Sized> ResolveContext<'a, A> {
    /// Context with no bias and a transparent background
    pub fn new(index: &'a CacheIndex, atlas: &'a A, range: LodRange) -> Self {
        Self {
            index,
            atlas,
            range,
            lod_bias: 0.0,
            background: Color::TRANSPARENT,
        }
    }

    pub fn from_config(
        index: &'a CacheIndex,
        atlas: &'a A,
        config: &VirtualTextureConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            index,
            atlas,
            range: config.lod_range()?,
            lod_bias: config.lod_bias,
            background: config.background,
        })
    }

    pub fn with_bias(mut self, lod_bias: f32) -> Self {
        self.lod_bias = lod_bias;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Desired level for a query, clamped into the range.
    ///
    /// The bias only applies to derivative estimates; explicit levels are
    /// taken as the caller's final answer.
    pub fn desired_level(&self, lod: LodInput) -> f32 {
        match lod {
            LodInput::Derivatives(derivatives) => {
                desired_level(level_estimate(&derivatives), self.lod_bias, &self.range)
            }
            LodInput::Level(level) => self.range.clamp(level),
        }
    }

    /// Run both level searches for a query
    pub fn resolution(&self, query: &SampleQuery) -> Resolution {
        let desired = self.desired_level(query.lod);
        resolve_levels(self.index, query.coord, desired, &self.range)
    }

    /// Resolve a query to its final color
    #[inline]
    pub fn resolve(&self, query: &SampleQuery) -> ResolvedSample {
        composite(&self.resolution(query), self.atlas, self.background)
    }
}

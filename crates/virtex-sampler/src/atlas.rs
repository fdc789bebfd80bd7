//! Atlas Reads
//!
//! The resolver hands normalized atlas coordinates to an [`AtlasSource`].
//! Filtering is the source's business; [`AtlasImage`] is an in-memory
//! RGBA32F atlas with bilinear filtering and clamp-to-edge addressing.

use glam::{IVec2, UVec2, Vec2};
use virtex_core::Color;
use virtex_index::AtlasLayout;

use crate::{SamplerError, SamplerResult};

/// Read primitive for the shared tile atlas
pub trait AtlasSource: Sync {
    /// Filtered color at normalized atlas coordinate `uv`
    fn read(&self, uv: Vec2) -> Color;
}

impl<T: AtlasSource + ?Sized> AtlasSource for &T {
    fn read(&self, uv: Vec2) -> Color {
        (**self).read(uv)
    }
}

/// Adapts a closure into an atlas
pub struct FnAtlas<F>(pub F);

impl<F> AtlasSource for FnAtlas<F>
where
    F: Fn(Vec2) -> Color + Sync,
{
    fn read(&self, uv: Vec2) -> Color {
        (self.0)(uv)
    }
}

/// CPU-side atlas image
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasImage {
    size: UVec2,
    texels: Vec<Color>,
}

impl AtlasImage {
    /// Create a transparent atlas
    pub fn new(size: UVec2) -> SamplerResult<Self> {
        Self::filled(size, Color::TRANSPARENT)
    }

    /// Create an atlas filled with one color
    pub fn filled(size: UVec2, color: Color) -> SamplerResult<Self> {
        if size.x == 0 || size.y == 0 {
            return Err(SamplerError::InvalidAtlas(format!("{}x{} atlas", size.x, size.y)));
        }
        Ok(Self {
            size,
            texels: vec![color; (size.x * size.y) as usize],
        })
    }

    /// Wrap existing row-major texels
    pub fn from_texels(size: UVec2, texels: Vec<Color>) -> SamplerResult<Self> {
        let expected = (size.x * size.y) as usize;
        if expected == 0 || texels.len() != expected {
            return Err(SamplerError::InvalidAtlas(format!(
                "{}x{} atlas needs {} texels, got {}",
                size.x,
                size.y,
                expected,
                texels.len()
            )));
        }
        Ok(Self { size, texels })
    }

    /// Size in texels
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Unfiltered texel, clamped to the edge
    #[inline]
    pub fn texel(&self, position: IVec2) -> Color {
        let max = self.size.as_ivec2() - IVec2::ONE;
        let p = position.clamp(IVec2::ZERO, max);
        self.texels[(p.y as u32 * self.size.x + p.x as u32) as usize]
    }

    /// Overwrite one texel; out-of-bounds writes are ignored
    pub fn set_texel(&mut self, position: UVec2, color: Color) {
        if position.x < self.size.x && position.y < self.size.y {
            self.texels[(position.y * self.size.x + position.x) as usize] = color;
        }
    }

    /// Write a tile's interior at `address` and replicate its edges into the
    /// border. `texel` receives interior-local texel coordinates.
    ///
    /// Fails if `address` is outside the layout or the layout does not match
    /// this atlas.
    pub fn write_tile(
        &mut self,
        layout: &AtlasLayout,
        address: u32,
        texel: impl Fn(UVec2) -> Color,
    ) -> SamplerResult<()> {
        if layout.atlas_size() != self.size {
            return Err(SamplerError::InvalidAtlas(format!(
                "layout is {}x{}, atlas is {}x{}",
                layout.atlas_size().x,
                layout.atlas_size().y,
                self.size.x,
                self.size.y
            )));
        }
        let Some(origin) = layout.interior_origin(address) else {
            return Err(SamplerError::InvalidAtlas(format!(
                "tile address {} outside a layout of {}",
                address,
                layout.capacity()
            )));
        };

        let tile = layout.tile_size() as i32;
        let border = layout.border() as i32;
        for y in -border..tile + border {
            for x in -border..tile + border {
                let local = IVec2::new(x, y).clamp(IVec2::ZERO, IVec2::splat(tile - 1));
                let target = origin.as_ivec2() + IVec2::new(x, y);
                self.set_texel(target.as_uvec2(), texel(local.as_uvec2()));
            }
        }
        Ok(())
    }
}

impl AtlasSource for AtlasImage {
    fn read(&self, uv: Vec2) -> Color {
        let p = uv * self.size.as_vec2() - Vec2::splat(0.5);
        // NaN clamps to -1; anything past the edge reads the edge texel
        let p0 = p.floor().clamp(Vec2::NEG_ONE, self.size.as_vec2());
        let f = (p - p0).clamp(Vec2::ZERO, Vec2::ONE);
        let i = p0.as_ivec2();

        let c00 = self.texel(i);
        let c10 = self.texel(i + IVec2::X);
        let c01 = self.texel(i + IVec2::Y);
        let c11 = self.texel(i + IVec2::ONE);

        c00.lerp(c10, f.x).lerp(c01.lerp(c11, f.x), f.y)
    }
}

//! Atlas Layout
//!
//! Cache slots are laid out row-major in the atlas. Each tile is stored with
//! a border of duplicated texels on every side, so the atlas footprint of a
//! tile (its backing size) is `tile_size + 2 * border`. The region recorded
//! in a [`crate::CacheEntry`] covers only the interior.

use glam::{UVec2, Vec2};
use virtex_core::Rect;

use crate::{IndexError, IndexResult};

/// Geometry of the shared tile atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    atlas_size: UVec2,
    tile_size: u32,
    border: u32,
}

impl AtlasLayout {
    /// Create a layout; the atlas must hold at least one tile
    pub fn new(atlas_size: UVec2, tile_size: u32, border: u32) -> IndexResult<Self> {
        if tile_size == 0 {
            return Err(IndexError::InvalidLayout("tile size must be non-zero".into()));
        }
        let layout = Self { atlas_size, tile_size, border };
        if layout.capacity() == 0 {
            return Err(IndexError::InvalidLayout(format!(
                "{}x{} atlas cannot fit a {} texel tile",
                atlas_size.x,
                atlas_size.y,
                layout.tile_backing_size()
            )));
        }
        Ok(layout)
    }

    /// Atlas size in texels
    pub fn atlas_size(&self) -> UVec2 {
        self.atlas_size
    }

    /// Tile interior size in texels
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Border width in texels
    pub fn border(&self) -> u32 {
        self.border
    }

    /// Footprint of one tile including its border
    #[inline]
    pub fn tile_backing_size(&self) -> u32 {
        self.tile_size + 2 * self.border
    }

    #[inline]
    pub fn tiles_across(&self) -> u32 {
        self.atlas_size.x / self.tile_backing_size()
    }

    #[inline]
    pub fn tiles_down(&self) -> u32 {
        self.atlas_size.y / self.tile_backing_size()
    }

    /// Number of tile addresses the atlas offers
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.tiles_across() * self.tiles_down()
    }

    /// Column and row of a tile address
    pub fn address_to_tile_coords(&self, address: u32) -> Option<UVec2> {
        if address >= self.capacity() {
            return None;
        }
        let across = self.tiles_across();
        Some(UVec2::new(address % across, address / across))
    }

    /// Texel position of the interior's top-left corner
    pub fn interior_origin(&self, address: u32) -> Option<UVec2> {
        self.address_to_tile_coords(address)
            .map(|coords| coords * self.tile_backing_size() + UVec2::splat(self.border))
    }

    /// Normalized atlas region of the tile interior at `address`
    pub fn region(&self, address: u32) -> Option<Rect> {
        let origin = self.interior_origin(address)?;
        let scale = Vec2::ONE / self.atlas_size.as_vec2();
        Some(Rect::from_origin_size(
            origin.as_vec2() * scale,
            Vec2::splat(self.tile_size as f32) * scale,
        ))
    }
}

//! Synthetic demo scene
//!
//! Builds a small atlas whose tiles are colored by level, makes a
//! pseudo-random subset of tiles resident and generates a grid of queries
//! whose desired level rises from the top of the image to the bottom.

use anyhow::Result;
use glam::{UVec2, Vec2};
use log::debug;
use serde::Serialize;
use virtex_core::key::ORIGIN_BITS;
use virtex_core::{hash32, Color, TileKey, VirtualTextureConfig};
use virtex_index::{AtlasLayout, CacheIndex, IndexError};
use virtex_sampler::{AtlasImage, Derivatives, ResolvedSample, SampleQuery};

/// Texels per demo tile, excluding the border
pub const DEMO_TILE_SIZE: u32 = 8;
const DEMO_BORDER: u32 = 1;
const RESIDENCY_SALT: u32 = 0x27d4_eb2f;

const PALETTE: [Color; 8] = [
    Color::new(0.90, 0.30, 0.25, 1.0),
    Color::new(0.95, 0.60, 0.20, 1.0),
    Color::new(0.95, 0.85, 0.30, 1.0),
    Color::new(0.45, 0.80, 0.35, 1.0),
    Color::new(0.25, 0.70, 0.75, 1.0),
    Color::new(0.30, 0.45, 0.85, 1.0),
    Color::new(0.55, 0.35, 0.80, 1.0),
    Color::new(0.85, 0.40, 0.70, 1.0),
];

/// Base color of a level
pub fn level_color(level: i32) -> Color {
    PALETTE[level.rem_euclid(PALETTE.len() as i32) as usize]
}

/// A built scene ready for resolution
pub struct DemoScene {
    pub index: CacheIndex,
    pub atlas: AtlasImage,
    pub layout: AtlasLayout,
    /// Tiles that made it into the index
    pub resident: usize,
    /// Selected tiles dropped for lack of a free slot or atlas space
    pub skipped: usize,
}

fn is_selected(key: &TileKey, residency: f32) -> bool {
    let h = hash32(key.pack() ^ RESIDENCY_SALT) as f64;
    h < residency as f64 * (u32::MAX as f64 + 1.0)
}

fn tile_texel(key: &TileKey, local: UVec2) -> Color {
    let quadrant = (local / (DEMO_TILE_SIZE / 2)).element_sum();
    let parity = key.origin().element_sum() + quadrant;
    let base = level_color(key.level());
    if parity % 2 == 0 {
        base
    } else {
        base.lerp(Color::BLACK, 0.25)
    }
}

/// Make a `residency` fraction of the tiles in the configured level range
/// resident. Coarse levels are admitted first.
///
/// Levels past [`ORIGIN_BITS`] have tiles that no key can address.
pub fn build_scene(config: &VirtualTextureConfig, residency: f32) -> Result<DemoScene> {
    let range = config.lod_range()?;
    anyhow::ensure!(
        range.max() <= ORIGIN_BITS as i32,
        "demo levels must not exceed {}, got {}",
        ORIGIN_BITS,
        range.max()
    );
    let selected: Vec<TileKey> = (range.min()..=range.max())
        .flat_map(|level| {
            let tiles = 1u32 << level;
            (0..tiles * tiles)
                .filter_map(move |i| TileKey::new(UVec2::new(i % tiles, i / tiles), level).ok())
        })
        .filter(|key| is_selected(key, residency))
        .collect();

    let wanted = selected.len().min(2 * config.cache_size as usize).max(1);
    let across = (wanted as f64).sqrt().ceil() as u32;
    let layout = AtlasLayout::new(
        UVec2::splat(across * (DEMO_TILE_SIZE + 2 * DEMO_BORDER)),
        DEMO_TILE_SIZE,
        DEMO_BORDER,
    )?;
    let mut atlas = AtlasImage::new(layout.atlas_size())?;
    let mut index = CacheIndex::from_config(config)?;

    let mut address = 0;
    let mut skipped = 0;
    for key in selected {
        let Some(region) = layout.region(address) else {
            skipped += 1;
            continue;
        };
        match index.place_any(key, region) {
            Ok(_) => {
                atlas.write_tile(&layout, address, |local| tile_texel(&key, local))?;
                address += 1;
            }
            Err(IndexError::SlotsOccupied(_)) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }
    debug!("demo scene: {} resident, {} skipped", address, skipped);

    Ok(DemoScene {
        index,
        atlas,
        layout,
        resident: address as usize,
        skipped,
    })
}

/// `size × size` queries over the level-0 tile; the desired level grows
/// linearly with `v` up to `max_level`
pub fn grid_queries(size: u32, max_level: i32) -> Vec<SampleQuery> {
    (0..size * size)
        .map(|i| {
            let coord = (Vec2::new((i % size) as f32, (i / size) as f32) + 0.5) / size as f32;
            let footprint = (-(max_level as f32) * coord.y).exp2();
            SampleQuery::with_derivatives(coord, Derivatives::isotropic(footprint))
        })
        .collect()
}

/// Resolved demo output, written as JSON
#[derive(Debug, Serialize)]
pub struct DemoImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels
    pub pixels: Vec<[u8; 4]>,
}

impl DemoImage {
    pub fn from_samples(size: u32, samples: &[ResolvedSample]) -> Self {
        Self {
            width: size,
            height: size,
            pixels: samples.iter().map(|s| s.color().to_rgba8()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_level: i32) -> VirtualTextureConfig {
        VirtualTextureConfig {
            cache_size: 256,
            max_level,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_residency() {
        let scene = build_scene(&config(3), 1.0).unwrap();
        // 1 + 4 + 16 + 64 tiles over levels 0..=3
        assert_eq!(scene.resident + scene.skipped, 85);
        assert!(scene.resident > 0);
        assert!(scene.index.validate().is_ok());
        assert_eq!(scene.index.stats().resident(), scene.resident);
    }

    #[test]
    fn test_zero_residency() {
        let scene = build_scene(&config(2), 0.0).unwrap();
        assert_eq!(scene.resident, 0);
        assert_eq!(scene.index.stats().resident(), 0);
    }

    #[test]
    fn test_resident_tiles_are_painted() {
        let scene = build_scene(&config(0), 1.0).unwrap();
        assert_eq!(scene.resident, 1);
        let (_, _, entry) = scene.index.resident().next().unwrap();
        let center = entry.region.lerp(Vec2::new(0.1, 0.1));
        let texel = (center * scene.atlas.size().as_vec2()).as_ivec2();
        assert_eq!(scene.atlas.texel(texel), level_color(0));
    }

    #[test]
    fn test_levels_beyond_key_range() {
        let deep = VirtualTextureConfig {
            min_level: 16,
            ..config(16)
        };
        assert!(build_scene(&deep, 0.5).is_err());
        assert!(build_scene(&config(14), 0.5).is_err());
    }

    #[test]
    fn test_grid_queries() {
        let queries = grid_queries(4, 6);
        assert_eq!(queries.len(), 16);
        assert_eq!(queries[5].coord, Vec2::new(0.375, 0.375));
    }
}

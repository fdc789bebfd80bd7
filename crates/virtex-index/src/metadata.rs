//! GPU metadata packing
//!
//! Flattens an index into an RGBA32F image `cache_size` texels wide and four
//! rows tall so a shader can run the same two-choice lookup:
//!
//! | row | contents                                   |
//! |-----|--------------------------------------------|
//! | 0   | subtable A keys `(x, y, level, 1)`         |
//! | 1   | subtable A regions `(min.x, min.y, max.x, max.y)` |
//! | 2   | subtable B keys                            |
//! | 3   | subtable B regions                         |
//!
//! Empty slots have a key texel of `-1` in every channel.

use crate::index::{CacheIndex, SubtableId};

/// Texel value stored in every channel of an empty key slot
pub const EMPTY_KEY: f32 = -1.0;

/// Rows per subtable
const ROWS_PER_SUBTABLE: u32 = 2;

/// Flattened RGBA32F index image
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMetadata {
    /// Width in texels (the cache size)
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Row-major RGBA texels
    pub texels: Vec<f32>,
}

impl IndexMetadata {
    /// Read one texel
    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        [
            self.texels[offset],
            self.texels[offset + 1],
            self.texels[offset + 2],
            self.texels[offset + 3],
        ]
    }

    /// Row holding the keys of `id`
    pub fn key_row(id: SubtableId) -> u32 {
        match id {
            SubtableId::A => 0,
            SubtableId::B => ROWS_PER_SUBTABLE,
        }
    }

    /// Row holding the regions of `id`
    pub fn region_row(id: SubtableId) -> u32 {
        Self::key_row(id) + 1
    }

    /// Size of the texel payload in bytes
    pub fn byte_len(&self) -> usize {
        self.texels.len() * std::mem::size_of::<f32>()
    }
}

impl CacheIndex {
    /// Pack the index for upload
    pub fn pack_metadata(&self) -> IndexMetadata {
        let width = self.cache_size() as u32;
        let height = ROWS_PER_SUBTABLE * 2;
        let stride = width as usize * 4;
        let mut texels = vec![0.0; stride * height as usize];

        for id in SubtableId::ALL {
            let key_row = IndexMetadata::key_row(id) as usize * stride;
            let region_row = IndexMetadata::region_row(id) as usize * stride;
            for (slot, entry) in self.subtable(id).entries().iter().enumerate() {
                let key_texel = match entry.key {
                    Some(key) => [
                        key.origin().x as f32,
                        key.origin().y as f32,
                        key.level() as f32,
                        1.0,
                    ],
                    None => [EMPTY_KEY; 4],
                };
                let region = entry.region;
                let region_texel = [region.min.x, region.min.y, region.max.x, region.max.y];

                let offset = slot * 4;
                texels[key_row + offset..key_row + offset + 4].copy_from_slice(&key_texel);
                texels[region_row + offset..region_row + offset + 4].copy_from_slice(&region_texel);
            }
        }

        IndexMetadata { width, height, texels }
    }
}

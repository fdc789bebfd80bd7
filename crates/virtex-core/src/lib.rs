//! # Virtex Core
//!
//! Foundation types for the Virtex sparse virtual texture.
//!
//! This crate provides the pieces every other Virtex crate agrees on:
//! - **Keys**: validated tile keys and their 32-bit packed layout
//! - **Hashing**: the avalanche mix and slot reduction used by the cache index
//! - **Math**: atlas rectangles, colors and mip level ranges
//! - **Configuration**: the serializable virtual texture settings

pub mod hash;
pub mod key;
pub mod math;

pub use hash::{hash32, slot};
pub use key::{KeyError, TileKey};
pub use math::{Color, LodRange, Rect};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid tile key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Invalid LOD range: {min}..={max}")]
    InvalidLodRange { min: i32, max: i32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Virtual texture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualTextureConfig {
    /// Tile size in texels, excluding the filtering border
    pub tile_size: u32,
    /// Entries per cache subtable
    pub cache_size: u32,
    /// Seeds of subtables A and B
    pub seeds: [u32; 2],
    /// Coarsest level the resolver may fall back to
    pub min_level: i32,
    /// Finest level the resolver may fall back to
    pub max_level: i32,
    /// Bias added to the derivative-based LOD estimate
    pub lod_bias: f32,
    /// Color returned when no level in range is resident
    pub background: Color,
    /// Only every n-th sample contributes residency feedback
    pub feedback_divisor: u32,
}

impl Default for VirtualTextureConfig {
    fn default() -> Self {
        Self {
            tile_size: 128,
            cache_size: 1024,
            seeds: [0x9e37_79b1, 0x85eb_ca77],
            min_level: 0,
            max_level: 12,
            lod_bias: 0.0,
            background: Color::TRANSPARENT,
            feedback_divisor: 8,
        }
    }
}

impl VirtualTextureConfig {
    /// Check every invariant the index and the resolver rely on
    pub fn validate(&self) -> CoreResult<()> {
        if self.tile_size == 0 {
            return Err(CoreError::InvalidConfig("tile_size must be non-zero".into()));
        }
        if self.cache_size == 0 {
            return Err(CoreError::InvalidConfig("cache_size must be non-zero".into()));
        }
        if self.seeds[0] == self.seeds[1] {
            return Err(CoreError::InvalidConfig("subtable seeds must differ".into()));
        }
        if self.feedback_divisor == 0 {
            return Err(CoreError::InvalidConfig("feedback_divisor must be non-zero".into()));
        }
        if !self.lod_bias.is_finite() {
            return Err(CoreError::InvalidConfig("lod_bias must be finite".into()));
        }
        self.lod_range()?;
        Ok(())
    }

    /// The configured level range
    pub fn lod_range(&self) -> CoreResult<LodRange> {
        LodRange::new(self.min_level, self.max_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VirtualTextureConfig::default();
        assert_eq!(config.tile_size, 128);
        assert!(config.validate().is_ok());
        assert_eq!(config.lod_range().unwrap(), LodRange::new(0, 12).unwrap());
    }

    #[test]
    fn test_config_validation() {
        let mut config = VirtualTextureConfig { seeds: [7, 7], ..Default::default() };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        config.seeds = [1, 2];
        config.max_level = 80;
        assert_eq!(
            config.validate(),
            Err(CoreError::InvalidLodRange { min: 0, max: 80 })
        );

        config.max_level = 4;
        config.cache_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_partial_json() {
        let config: VirtualTextureConfig =
            serde_json::from_str(r#"{ "cache_size": 4, "seeds": [1, 2], "max_level": 4 }"#).unwrap();
        assert_eq!(config.cache_size, 4);
        assert_eq!(config.tile_size, 128);
        assert!(config.validate().is_ok());
    }
}

//! # Virtex Sampler
//!
//! Resolves sample queries against a published cache index and a shared
//! tile atlas.
//!
//! ## Features
//! - LOD estimation from coordinate derivatives
//! - Two-direction fallback search for the nearest resident levels
//! - Blending between the found levels, background on a total miss
//! - Parallel batch resolution
//! - Residency feedback for the streaming side

pub mod atlas;
pub mod batch;
pub mod compositor;
pub mod context;
pub mod feedback;
pub mod lod;
pub mod resolver;

pub use atlas::{AtlasImage, AtlasSource, FnAtlas};
pub use batch::{resolve_batch, resolve_batch_into, BatchStats};
pub use compositor::{composite, ResolvedSample};
pub use context::{ResolveContext, SampleQuery};
pub use feedback::{collect_feedback, StreamingPriority, TileRequest};
pub use lod::{Derivatives, LodInput};
pub use resolver::{resolve_levels, Found, Resolution, SearchOutcome};

use log::debug;
use thiserror::Error;
use virtex_core::{CoreError, LodRange, VirtualTextureConfig};
use virtex_index::{CacheIndex, IndexError, IndexPublisher};

/// Sampler errors
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Invalid atlas: {0}")]
    InvalidAtlas(String),
}

/// Result type for sampler operations
pub type SamplerResult<T> = Result<T, SamplerError>;

/// Statistics of the last resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassStats {
    /// Index epoch the pass read
    pub epoch: u64,
    /// Outcome counts
    pub batch: BatchStats,
}

/// A virtual texture: configuration, published index and atlas
pub struct VirtualTexture<A: AtlasSource> {
    config: VirtualTextureConfig,
    range: LodRange,
    publisher: IndexPublisher,
    atlas: A,
    stats: PassStats,
    pass_number: u64,
}

impl<A: AtlasSource> VirtualTexture<A> {
    /// Create a virtual texture with an empty index
    pub fn new(config: VirtualTextureConfig, atlas: A) -> SamplerResult<Self> {
        config.validate()?;
        let index = CacheIndex::from_config(&config)?;
        Self::with_index(config, index, atlas)
    }

    /// Create a virtual texture around an existing index
    pub fn with_index(config: VirtualTextureConfig, index: CacheIndex, atlas: A) -> SamplerResult<Self> {
        config.validate()?;
        let range = config.lod_range()?;
        Ok(Self {
            config,
            range,
            publisher: IndexPublisher::new(index),
            atlas,
            stats: PassStats::default(),
            pass_number: 0,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &VirtualTextureConfig {
        &self.config
    }

    /// Index publisher; the residency manager publishes through it
    pub fn publisher(&self) -> &IndexPublisher {
        &self.publisher
    }

    pub fn atlas(&self) -> &A {
        &self.atlas
    }

    /// Mutable atlas access for tile uploads between passes
    pub fn atlas_mut(&mut self) -> &mut A {
        &mut self.atlas
    }

    /// Statistics of the last pass
    pub fn stats(&self) -> &PassStats {
        &self.stats
    }

    /// Number of completed passes
    pub fn pass_number(&self) -> u64 {
        self.pass_number
    }

    /// Resolve a batch against the current snapshot.
    ///
    /// The snapshot is taken once, so a publish during the pass is only
    /// seen by the next one.
    pub fn resolve_pass(&mut self, queries: &[SampleQuery]) -> Vec<ResolvedSample> {
        let snapshot = self.publisher.snapshot();
        let samples = {
            let ctx = self.context(&snapshot);
            resolve_batch(&ctx, queries)
        };

        self.pass_number += 1;
        self.stats = PassStats {
            epoch: snapshot.epoch(),
            batch: BatchStats::from_samples(&samples),
        };
        debug!(
            "pass {} at epoch {}: {} blended, {} single, {} miss",
            self.pass_number,
            self.stats.epoch,
            self.stats.batch.blended,
            self.stats.batch.single,
            self.stats.batch.miss
        );
        samples
    }

    /// Missing tiles for a batch, subsampled by the configured divisor
    pub fn feedback(&self, queries: &[SampleQuery]) -> Vec<TileRequest> {
        let snapshot = self.publisher.snapshot();
        let ctx = self.context(&snapshot);
        collect_feedback(&ctx, queries, self.config.feedback_divisor as usize)
    }

    fn context<'a>(&'a self, index: &'a CacheIndex) -> ResolveContext<'a, A> {
        ResolveContext::new(index, &self.atlas, self.range)
            .with_bias(self.config.lod_bias)
            .with_background(self.config.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{UVec2, Vec2};
    use virtex_core::{Color, TileKey};
    use virtex_index::AtlasLayout;

    fn config() -> VirtualTextureConfig {
        VirtualTextureConfig {
            tile_size: 4,
            cache_size: 32,
            seeds: [3, 5],
            max_level: 4,
            feedback_divisor: 1,
            background: Color::new(1.0, 0.0, 1.0, 1.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_creation_validates_config() {
        let atlas = AtlasImage::new(UVec2::splat(16)).unwrap();
        let bad = VirtualTextureConfig { seeds: [9, 9], ..config() };
        assert!(matches!(
            VirtualTexture::new(bad, atlas.clone()),
            Err(SamplerError::Core(CoreError::InvalidConfig(_)))
        ));

        let texture = VirtualTexture::new(config(), atlas).unwrap();
        assert_eq!(texture.pass_number(), 0);
        assert_eq!(texture.publisher().snapshot().cache_size(), 32);
    }

    #[test]
    fn test_pass_sees_published_tiles() {
        let layout = AtlasLayout::new(UVec2::splat(12), 4, 1).unwrap();
        let atlas = AtlasImage::new(layout.atlas_size()).unwrap();
        let mut texture = VirtualTexture::new(config(), atlas).unwrap();
        let queries = [SampleQuery::at_level(Vec2::new(0.5, 0.5), 0.0)];

        let before = texture.resolve_pass(&queries);
        assert_eq!(before[0], ResolvedSample::Miss { color: config().background });
        assert_eq!(texture.stats().batch.miss, 1);
        assert_eq!(texture.feedback(&queries)[0].key, TileKey::new(UVec2::ZERO, 0).unwrap());

        // upload and publish the requested tile
        let green = Color::new(0.0, 1.0, 0.0, 1.0);
        texture.atlas_mut().write_tile(&layout, 0, |_| green).unwrap();
        let key = TileKey::new(UVec2::ZERO, 0).unwrap();
        let region = layout.region(0).unwrap();
        let (epoch, placed) = texture.publisher().update(|index| index.place_any(key, region));
        assert!(placed.is_ok());

        let after = texture.resolve_pass(&queries);
        assert_eq!(after[0], ResolvedSample::Single { level: 0, color: green });
        assert_eq!(texture.stats().epoch, epoch);
        assert_eq!(texture.pass_number(), 2);
        assert!(texture.feedback(&queries).is_empty());
    }
}

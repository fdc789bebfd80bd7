//! Batch Resolution
//!
//! Queries are independent, so a pass is a parallel map over them.

use rayon::prelude::*;

use crate::atlas::AtlasSource;
use crate::compositor::ResolvedSample;
use crate::context::{ResolveContext, SampleQuery};

/// Resolve every query in parallel; output order matches input order
pub fn resolve_batch<A>(ctx: &ResolveContext<'_, A>, queries: &[SampleQuery]) -> Vec<ResolvedSample>
where
    A: AtlasSource + ?Sized,
{
    queries.par_iter().map(|query| ctx.resolve(query)).collect()
}

/// Resolve into a caller-provided buffer, reusing its allocation.
///
/// Only the first `min(queries.len(), out.len())` entries are written.
pub fn resolve_batch_into<A>(
    ctx: &ResolveContext<'_, A>,
    queries: &[SampleQuery],
    out: &mut [ResolvedSample],
) where
    A: AtlasSource + ?Sized,
{
    out.par_iter_mut()
        .zip(queries.par_iter())
        .for_each(|(slot, query)| *slot = ctx.resolve(query));
}

/// Outcome counts for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub blended: usize,
    pub single: usize,
    pub miss: usize,
}

impl BatchStats {
    pub fn from_samples(samples: &[ResolvedSample]) -> Self {
        samples.iter().fold(Self::default(), |mut stats, sample| {
            match sample {
                ResolvedSample::Blended { .. } => stats.blended += 1,
                ResolvedSample::Single { .. } => stats.single += 1,
                ResolvedSample::Miss { .. } => stats.miss += 1,
            }
            stats
        })
    }

    pub fn total(&self) -> usize {
        self.blended + self.single + self.miss
    }

    /// Fraction of samples served from a resident tile
    pub fn hit_rate(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.blended + self.single) as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::AtlasImage;
    use crate::lod::Derivatives;
    use crate::resolver::tile_at;
    use glam::{UVec2, Vec2};
    use virtex_core::{Color, LodRange};
    use virtex_index::{AtlasLayout, CacheIndex};

    /// 4x4 grid of 4-texel tiles; levels 0 and 1 partially resident
    fn fixture() -> (CacheIndex, AtlasImage) {
        let layout = AtlasLayout::new(UVec2::splat(24), 4, 1).unwrap();
        let mut atlas = AtlasImage::new(layout.atlas_size()).unwrap();
        let mut index = CacheIndex::new(64, [11, 29]).unwrap();

        let mut address = 0;
        for level in 0..2 {
            let tiles = 1u32 << level;
            for y in 0..tiles {
                for x in 0..tiles {
                    if (x + y + level as u32) % 2 == 1 {
                        continue;
                    }
                    let coord = (UVec2::new(x, y).as_vec2() + 0.5) / tiles as f32;
                    let (key, _) = tile_at(coord, level).unwrap();
                    let shade = (address + 1) as f32 / 8.0;
                    atlas
                        .write_tile(&layout, address, |_| Color::new(shade, shade, 0.0, 1.0))
                        .unwrap();
                    index.place_any(key, layout.region(address).unwrap()).unwrap();
                    address += 1;
                }
            }
        }
        (index, atlas)
    }

    fn grid(n: u32) -> Vec<SampleQuery> {
        (0..n * n)
            .map(|i| {
                let coord = (Vec2::new((i % n) as f32, (i / n) as f32) + 0.5) / n as f32;
                SampleQuery::with_derivatives(coord, Derivatives::isotropic(0.7 / n as f32))
            })
            .collect()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (index, atlas) = fixture();
        let ctx = ResolveContext::new(&index, &atlas, LodRange::new(0, 3).unwrap())
            .with_background(Color::new(1.0, 0.0, 1.0, 1.0));
        let queries = grid(32);

        let sequential: Vec<_> = queries.iter().map(|q| ctx.resolve(q)).collect();
        assert_eq!(resolve_batch(&ctx, &queries), sequential);

        let mut out = vec![ResolvedSample::Miss { color: Color::TRANSPARENT }; queries.len()];
        resolve_batch_into(&ctx, &queries, &mut out);
        assert_eq!(out, sequential);
    }

    #[test]
    fn test_batch_stats() {
        let (index, atlas) = fixture();
        let ctx = ResolveContext::new(&index, &atlas, LodRange::new(0, 3).unwrap());
        let samples = resolve_batch(&ctx, &grid(16));
        let stats = BatchStats::from_samples(&samples);

        assert_eq!(stats.total(), 256);
        // level 0 is resident everywhere, so nothing misses
        assert_eq!(stats.miss, 0);
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(BatchStats::default().hit_rate(), 0.0);
    }
}

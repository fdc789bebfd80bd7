//! Residency Feedback
//!
//! A pass can report which tiles it wanted but did not find. Every
//! `divisor`-th query contributes the keys at `floor(d)` and `ceil(d)`; the
//! streaming side decides what to admit. Nothing here writes the index.

use ahash::AHashMap;
use rayon::prelude::*;
use smallvec::SmallVec;
use virtex_core::TileKey;

use crate::atlas::AtlasSource;
use crate::context::{ResolveContext, SampleQuery};
use crate::resolver::{tile_at, SearchOutcome};

/// Streaming priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum StreamingPriority {
    /// Both searches found a substitute
    #[default]
    Normal = 0,
    /// Only one search found a substitute
    High = 1,
    /// The query fell back to the background color
    Critical = 2,
}

impl StreamingPriority {
    fn from_outcome(outcome: SearchOutcome) -> Self {
        if outcome.is_all() {
            Self::Normal
        } else if outcome.is_empty() {
            Self::Critical
        } else {
            Self::High
        }
    }
}

/// A non-resident tile some queries asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub key: TileKey,
    /// Number of sampled queries that wanted it
    pub count: u32,
    /// Highest priority among those queries
    pub priority: StreamingPriority,
}

type Tally = AHashMap<TileKey, (u32, StreamingPriority)>;

/// Tally the missing tiles of every `divisor`-th query.
///
/// Requests are ordered by priority, then count (both descending), then by
/// packed key so the order is deterministic.
pub fn collect_feedback<A>(
    ctx: &ResolveContext<'_, A>,
    queries: &[SampleQuery],
    divisor: usize,
) -> Vec<TileRequest>
where
    A: AtlasSource + ?Sized,
{
    let divisor = divisor.max(1);
    let tally = queries
        .par_iter()
        .step_by(divisor)
        .fold(Tally::default, |mut tally, query| {
            record(ctx, query, &mut tally);
            tally
        })
        .reduce(Tally::default, merge);

    let mut requests: Vec<TileRequest> = tally
        .into_iter()
        .map(|(key, (count, priority))| TileRequest {
            key,
            count,
            priority,
        })
        .collect();
    requests.sort_unstable_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.count.cmp(&a.count))
            .then(a.key.pack().cmp(&b.key.pack()))
    });
    requests
}

fn record<A: AtlasSource + ?Sized>(ctx: &ResolveContext<'_, A>, query: &SampleQuery, tally: &mut Tally) {
    let resolution = ctx.resolution(query);
    let floor = resolution.desired.floor() as i32;
    let ceil = resolution.desired.ceil() as i32;

    let mut levels: SmallVec<[i32; 2]> = SmallVec::new();
    levels.push(floor);
    if ceil != floor {
        levels.push(ceil);
    }

    let priority = StreamingPriority::from_outcome(resolution.outcome());
    for level in levels {
        let Some((key, _)) = tile_at(query.coord, level) else {
            continue;
        };
        if ctx.index.contains(&key) {
            continue;
        }
        let entry = tally.entry(key).or_insert((0, priority));
        entry.0 += 1;
        entry.1 = entry.1.max(priority);
    }
}

fn merge(mut into: Tally, from: Tally) -> Tally {
    for (key, (count, priority)) in from {
        let entry = into.entry(key).or_insert((0, priority));
        entry.0 += count;
        entry.1 = entry.1.max(priority);
    }
    into
}

//! Cache Index
//!
//! Two fixed-size subtables, each addressed by its own seeded hash of the
//! tile key. A resident tile sits at exactly one of its two candidate slots;
//! there is no chaining, probing or relocation. Lookups read one slot per
//! subtable and compare keys, so a miss costs at most two reads.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use virtex_core::{Rect, TileKey, slot};

use crate::{IndexError, IndexResult};

/// Which of the two subtables an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubtableId {
    A,
    B,
}

impl SubtableId {
    /// Both subtables in lookup order
    pub const ALL: [SubtableId; 2] = [SubtableId::A, SubtableId::B];

    #[inline]
    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// The other subtable
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for SubtableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// One slot of a subtable
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resident tile, if any
    pub key: Option<TileKey>,
    /// Region of the atlas the tile was written into
    pub region: Rect,
}

impl CacheEntry {
    /// An occupied entry
    pub fn resident(key: TileKey, region: Rect) -> Self {
        Self { key: Some(key), region }
    }

    /// Check if this entry holds `key`
    #[inline]
    pub fn holds(&self, key: &TileKey) -> bool {
        self.key.as_ref() == Some(key)
    }

    /// Check if the slot is free
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.key.is_none()
    }
}

/// A fixed-length array of entries addressed by one seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtable {
    seed: u32,
    entries: Box<[CacheEntry]>,
}

impl Subtable {
    fn new(seed: u32, cache_size: usize) -> Self {
        Self {
            seed,
            entries: vec![CacheEntry::default(); cache_size].into_boxed_slice(),
        }
    }

    /// Seed mixed into this subtable's slot hash
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the subtable has no slots
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All slots in order
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// The only slot `key` may occupy in this subtable
    #[inline]
    pub fn slot_of(&self, key: &TileKey) -> usize {
        slot(key, self.seed, self.entries.len())
    }

    /// Read the key's candidate slot; `Some` only on an exact key match
    #[inline]
    pub fn lookup(&self, key: &TileKey) -> Option<&CacheEntry> {
        let entry = &self.entries[self.slot_of(key)];
        if entry.holds(key) { Some(entry) } else { None }
    }

    fn occupied(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_empty()).count()
    }
}

/// Occupancy summary of an index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexStats {
    /// Slots per subtable
    pub cache_size: usize,
    /// Occupied slots in subtables A and B
    pub occupied: [usize; 2],
    /// Resident tiles per mip level
    pub per_level: BTreeMap<i32, usize>,
}

impl IndexStats {
    /// Total resident tiles
    pub fn resident(&self) -> usize {
        self.occupied[0] + self.occupied[1]
    }

    /// Fraction of all slots that are occupied
    pub fn load_factor(&self) -> f32 {
        if self.cache_size == 0 {
            0.0
        } else {
            self.resident() as f32 / (2 * self.cache_size) as f32
        }
    }
}

/// The two-subtable tile cache index.
///
/// Readers only ever call [`CacheIndex::lookup_either`] (or
/// [`CacheIndex::lookup`]); the mutating methods belong to whoever manages
/// residency and must not run while a resolution pass reads the same index.
/// Share snapshots through [`crate::IndexPublisher`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IndexParts")]
pub struct CacheIndex {
    subtables: [Subtable; 2],
}

/// Unvalidated serde form of [`CacheIndex`]
#[derive(Deserialize)]
struct IndexParts {
    subtables: [Subtable; 2],
}

impl TryFrom<IndexParts> for CacheIndex {
    type Error = IndexError;

    fn try_from(parts: IndexParts) -> IndexResult<Self> {
        let index = CacheIndex { subtables: parts.subtables };
        index.validate()?;
        Ok(index)
    }
}

impl CacheIndex {
    /// Create an empty index with `cache_size` slots per subtable
    pub fn new(cache_size: usize, seeds: [u32; 2]) -> IndexResult<Self> {
        if cache_size == 0 {
            return Err(IndexError::ZeroCapacity);
        }
        if seeds[0] == seeds[1] {
            return Err(IndexError::DuplicateSeeds(seeds[0]));
        }
        Ok(Self {
            subtables: [
                Subtable::new(seeds[0], cache_size),
                Subtable::new(seeds[1], cache_size),
            ],
        })
    }

    /// Create an empty index sized by a configuration
    pub fn from_config(config: &virtex_core::VirtualTextureConfig) -> IndexResult<Self> {
        Self::new(config.cache_size as usize, config.seeds)
    }

    /// Slots per subtable
    #[inline]
    pub fn cache_size(&self) -> usize {
        self.subtables[0].len()
    }

    /// Seed of one subtable
    pub fn seed(&self, id: SubtableId) -> u32 {
        self.subtables[id.index()].seed
    }

    /// Borrow one subtable
    pub fn subtable(&self, id: SubtableId) -> &Subtable {
        &self.subtables[id.index()]
    }

    /// Look `key` up in a single subtable
    #[inline]
    pub fn lookup(&self, id: SubtableId, key: &TileKey) -> Option<&CacheEntry> {
        self.subtables[id.index()].lookup(key)
    }

    /// Two-choice lookup: subtable A first, then B. A wins if both match.
    #[inline]
    pub fn lookup_either(&self, key: &TileKey) -> Option<(&CacheEntry, SubtableId)> {
        for id in SubtableId::ALL {
            if let Some(entry) = self.lookup(id, key) {
                return Some((entry, id));
            }
        }
        trace!("lookup_either({}) missed both subtables", key);
        None
    }

    /// Check if `key` is resident in either subtable
    pub fn contains(&self, key: &TileKey) -> bool {
        self.lookup_either(key).is_some()
    }

    /// Write `key` into its candidate slot in subtable `id`.
    ///
    /// Returns the entry that previously occupied that slot, if any. A copy of
    /// `key` resident in the other subtable is cleared so the key stays at a
    /// single location.
    pub fn place(&mut self, id: SubtableId, key: TileKey, region: Rect) -> Option<CacheEntry> {
        let subtable = &mut self.subtables[id.index()];
        let slot = subtable.slot_of(&key);
        let previous = std::mem::replace(
            &mut subtable.entries[slot],
            CacheEntry::resident(key, region),
        );
        debug!("place {} -> {}[{}]", key, id, slot);

        let other = &mut self.subtables[id.other().index()];
        let other_slot = other.slot_of(&key);
        if other.entries[other_slot].holds(&key) {
            debug!("... cleared stale copy in {}[{}]", id.other(), other_slot);
            other.entries[other_slot] = CacheEntry::default();
        }

        if previous.is_empty() { None } else { Some(previous) }
    }

    /// Write `key` into whichever candidate slot can take it without
    /// displacing another tile.
    ///
    /// A key that is already resident is updated in place. Otherwise A is
    /// tried before B. When both candidate slots hold other tiles the index
    /// is left untouched and [`IndexError::SlotsOccupied`] is returned.
    pub fn place_any(&mut self, key: TileKey, region: Rect) -> IndexResult<SubtableId> {
        let target = match self.lookup_either(&key) {
            Some((_, id)) => Some(id),
            None => SubtableId::ALL.into_iter().find(|&id| {
                let subtable = &self.subtables[id.index()];
                subtable.entries[subtable.slot_of(&key)].is_empty()
            }),
        };

        match target {
            Some(id) => {
                self.place(id, key, region);
                Ok(id)
            }
            None => {
                debug!("place_any({}) found both candidate slots occupied", key);
                Err(IndexError::SlotsOccupied(key))
            }
        }
    }

    /// Remove `key` from whichever subtable holds it
    pub fn evict(&mut self, key: &TileKey) -> Option<(CacheEntry, SubtableId)> {
        let (_, id) = self.lookup_either(key)?;
        let subtable = &mut self.subtables[id.index()];
        let slot = subtable.slot_of(key);
        let entry = std::mem::take(&mut subtable.entries[slot]);
        debug!("evict {} from {}[{}]", key, id, slot);
        Some((entry, id))
    }

    /// Empty both subtables, keeping capacity and seeds
    pub fn clear(&mut self) {
        for subtable in &mut self.subtables {
            subtable.entries.fill(CacheEntry::default());
        }
    }

    /// Iterate over occupied slots as `(subtable, slot, entry)`
    pub fn resident(&self) -> impl Iterator<Item = (SubtableId, usize, &CacheEntry)> + '_ {
        SubtableId::ALL.into_iter().flat_map(move |id| {
            self.subtables[id.index()]
                .entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| !entry.is_empty())
                .map(move |(slot, entry)| (id, slot, entry))
        })
    }

    /// Summarize occupancy
    pub fn stats(&self) -> IndexStats {
        let mut per_level = BTreeMap::new();
        for (_, _, entry) in self.resident() {
            if let Some(key) = entry.key {
                *per_level.entry(key.level()).or_insert(0) += 1;
            }
        }
        IndexStats {
            cache_size: self.cache_size(),
            occupied: [self.subtables[0].occupied(), self.subtables[1].occupied()],
            per_level,
        }
    }

    /// Check the structural invariants: equal non-zero capacities, distinct
    /// seeds, and every resident key sitting at its own candidate slot.
    pub fn validate(&self) -> IndexResult<()> {
        let [a, b] = &self.subtables;
        if a.is_empty() || b.is_empty() {
            return Err(IndexError::ZeroCapacity);
        }
        if a.len() != b.len() {
            return Err(IndexError::MismatchedSubtables { a: a.len(), b: b.len() });
        }
        if a.seed == b.seed {
            return Err(IndexError::DuplicateSeeds(a.seed));
        }
        for (id, slot, entry) in self.resident() {
            if let Some(key) = entry.key {
                let expected = self.subtables[id.index()].slot_of(&key);
                if expected != slot {
                    return Err(IndexError::Misplaced { key, subtable: id, slot, expected });
                }
                if !entry.region.is_finite() {
                    return Err(IndexError::NonFiniteRegion { key, subtable: id, slot });
                }
            }
        }
        Ok(())
    }
}

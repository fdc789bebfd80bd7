//! # Virtex Index
//!
//! The tile cache index of the Virtex virtual texture.
//!
//! ## Features
//! - Two-choice hashed lookup over two fixed-size subtables
//! - Mechanical placement and eviction for the residency manager
//! - Epoch-based snapshot publishing between passes
//! - Atlas layout helpers for tile regions with filtering borders
//! - JSON and binary persistence, GPU metadata packing

pub mod index;
pub mod layout;
pub mod metadata;
pub mod persist;
pub mod snapshot;

pub use index::{CacheEntry, CacheIndex, IndexStats, Subtable, SubtableId};
pub use layout::AtlasLayout;
pub use metadata::IndexMetadata;
pub use snapshot::{IndexPublisher, IndexSnapshot};

use thiserror::Error;
use virtex_core::TileKey;

/// Index errors
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cache index capacity must be non-zero")]
    ZeroCapacity,

    #[error("Subtable seeds must differ (both are {0:#x})")]
    DuplicateSeeds(u32),

    #[error("Subtable lengths differ: A has {a} slots, B has {b}")]
    MismatchedSubtables { a: usize, b: usize },

    #[error("Key {key} found in {subtable}[{slot}] but hashes to slot {expected}")]
    Misplaced {
        key: TileKey,
        subtable: SubtableId,
        slot: usize,
        expected: usize,
    },

    #[error("Key {key} in {subtable}[{slot}] has a non-finite atlas region")]
    NonFiniteRegion {
        key: TileKey,
        subtable: SubtableId,
        slot: usize,
    },

    #[error("Both candidate slots for {0} hold other tiles")]
    SlotsOccupied(TileKey),

    #[error("Invalid atlas layout: {0}")]
    InvalidLayout(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

//! Persistence
//!
//! Indices can be written as JSON (for inspection) or bincode (compact).
//! Loading always re-validates the slot invariants.

use std::fs;
use std::path::Path;

use log::debug;

use crate::{CacheIndex, IndexResult};

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Json,
    Binary,
}

impl IndexFormat {
    /// Pick a format from a file extension; anything but `.json` is binary
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Binary,
        }
    }
}

impl CacheIndex {
    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> IndexResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> IndexResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to bincode
    pub fn to_bytes(&self) -> IndexResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bincode
    pub fn from_bytes(bytes: &[u8]) -> IndexResult<Self> {
        let index: Self = bincode::deserialize(bytes)?;
        Ok(index)
    }

    /// Write to `path`, choosing the format from its extension
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        match IndexFormat::from_path(path) {
            IndexFormat::Json => fs::write(path, self.to_json()?)?,
            IndexFormat::Binary => fs::write(path, self.to_bytes()?)?,
        }
        debug!("saved {}-slot index to {}", self.cache_size(), path.display());
        Ok(())
    }

    /// Read from `path`, choosing the format from its extension
    pub fn load(path: &Path) -> IndexResult<Self> {
        let index = match IndexFormat::from_path(path) {
            IndexFormat::Json => Self::from_json(&fs::read_to_string(path)?),
            IndexFormat::Binary => Self::from_bytes(&fs::read(path)?),
        };
        if let Err(err) = &index {
            debug!("failed to load index from {}: {}", path.display(), err);
        }
        index
    }
}

//! Snapshot Publishing
//!
//! A single writer builds the next index and publishes it between resolution
//! passes; readers take an [`IndexSnapshot`] at the start of a pass and keep
//! reading that version until they drop it. A published index is never
//! mutated again.

use std::ops::Deref;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::CacheIndex;

/// An immutable published version of the index
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    epoch: u64,
    index: Arc<CacheIndex>,
}

impl IndexSnapshot {
    /// Publication counter; starts at 0 and grows by one per publish
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Shared handle to the index
    pub fn index(&self) -> &Arc<CacheIndex> {
        &self.index
    }
}

impl Deref for IndexSnapshot {
    type Target = CacheIndex;

    fn deref(&self) -> &CacheIndex {
        &self.index
    }
}

/// Hands index versions from the residency manager to resolution passes
pub struct IndexPublisher {
    current: RwLock<IndexSnapshot>,
}

impl IndexPublisher {
    /// Start publishing with `index` as epoch 0
    pub fn new(index: CacheIndex) -> Self {
        Self {
            current: RwLock::new(IndexSnapshot {
                epoch: 0,
                index: Arc::new(index),
            }),
        }
    }

    /// Take the current snapshot
    pub fn snapshot(&self) -> IndexSnapshot {
        self.current.read().clone()
    }

    /// Current epoch
    pub fn epoch(&self) -> u64 {
        self.current.read().epoch
    }

    /// Replace the published index; returns the new epoch
    pub fn publish(&self, index: CacheIndex) -> u64 {
        let mut current = self.current.write();
        let epoch = current.epoch + 1;
        *current = IndexSnapshot {
            epoch,
            index: Arc::new(index),
        };
        debug!("published index epoch {}", epoch);
        epoch
    }

    /// Copy the current index, let `edit` modify the copy, and publish it.
    ///
    /// The write lock is held for the whole edit so concurrent `update`
    /// calls cannot lose each other's changes.
    pub fn update<R>(&self, edit: impl FnOnce(&mut CacheIndex) -> R) -> (u64, R) {
        let mut current = self.current.write();
        let mut next = CacheIndex::clone(&current.index);
        let result = edit(&mut next);
        let epoch = current.epoch + 1;
        *current = IndexSnapshot {
            epoch,
            index: Arc::new(next),
        };
        debug!("published index epoch {} after update", epoch);
        (epoch, result)
    }
}

//! Write-only batches
//!
//! A [`Batch`] accumulates puts and deletes and flushes them to the
//! engine as one atomic write on [`Batch::commit`]. Unlike a
//! transaction it offers no reads and no isolation: nothing is visible
//! anywhere until commit, so no discard step is needed.

use crate::datastore::StoreInner;
use crate::overlay::{self, Mutation, Overlay};
use shale_core::error::Result;
use shale_core::key::Key;
use std::sync::Arc;

/// An accumulator of writes applied atomically on commit.
///
/// Obtained from `Datastore::batch`.
pub struct Batch {
    store: Arc<StoreInner>,
    overlay: Overlay,
}

impl Batch {
    pub(crate) fn new(store: Arc<StoreInner>) -> Self {
        Batch {
            store,
            overlay: Overlay::new(),
        }
    }

    /// Record a pending write.
    pub fn put(&mut self, key: &Key, value: &[u8]) -> Result<()> {
        self.overlay
            .insert(key.clone(), Mutation::Put(value.to_vec()));
        Ok(())
    }

    /// Record a pending delete.
    pub fn delete(&mut self, key: &Key) -> Result<()> {
        self.overlay.insert(key.clone(), Mutation::Tombstone);
        Ok(())
    }

    /// Number of pending mutations.
    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    /// Apply every pending mutation as one atomic engine write.
    ///
    /// On success the batch is drained and can be reused. On failure
    /// the accumulated mutations are kept so the caller may retry.
    ///
    /// # Errors
    ///
    /// `Closed` if the datastore shut down; `Engine` if the write
    /// fails. Either way nothing was applied.
    pub fn commit(&mut self) -> Result<()> {
        let engine = self.store.engine()?;
        engine.apply_batch(overlay::to_write_batch(&self.overlay))?;
        self.overlay.clear();
        Ok(())
    }
}

//! Pending-mutation overlays
//!
//! An overlay is the in-memory map of writes a transaction or batch has
//! accumulated but not yet flushed to the engine. Insertion order is
//! irrelevant; the last write for a key wins.

use shale_core::key::Key;
use shale_core::traits::{ScanRange, WriteBatch};
use std::collections::BTreeMap;
use std::ops::Bound;

/// A pending mutation for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Mutation {
    /// Pending write of a value.
    Put(Vec<u8>),
    /// Pending delete, masking any underlying value until commit.
    Tombstone,
}

/// Key-ordered map of pending mutations.
pub(crate) type Overlay = BTreeMap<Key, Mutation>;

/// Convert an overlay into the engine batch that applies it.
pub(crate) fn to_write_batch(overlay: &Overlay) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for (key, mutation) in overlay {
        match mutation {
            Mutation::Put(value) => batch.put(key.as_bytes(), value),
            Mutation::Tombstone => batch.delete(key.as_bytes()),
        }
    }
    batch
}

/// Clone the overlay entries falling inside `range`, in key order.
///
/// Queries capture this slice at scan start so the result sequence
/// stays consistent while the owner keeps mutating the overlay.
pub(crate) fn slice(overlay: &Overlay, range: &ScanRange) -> Vec<(Key, Mutation)> {
    let start = Bound::Included(Key::new(range.start.clone()));
    let end = match &range.end {
        Some(end) => Bound::Excluded(Key::new(end.clone())),
        None => Bound::Unbounded,
    };
    overlay
        .range((start, end))
        .map(|(key, mutation)| (key.clone(), mutation.clone()))
        .collect()
}

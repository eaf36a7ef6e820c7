//! The engine adapter contract
//!
//! This module defines the [`Engine`] and [`Snapshot`] traits that the
//! datastore layer consumes. The underlying store only has to provide
//! single-key durability, sorted iteration, point-in-time read views and
//! atomic batch writes; everything richer (transactions, queries,
//! shutdown coordination) is composed on top by `shale-store`.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple threads (implementations require `Send + Sync`).

use crate::error::Result;
use std::path::Path;

/// A raw key/value pair as stored by the engine.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// A boxed engine iterator yielding pairs in ascending byte order.
///
/// Dropping the iterator releases whatever engine resources back it.
pub type KvIter = Box<dyn Iterator<Item = Result<KvPair>> + Send>;

/// Half-open byte range for ordered scans.
///
/// `start` is inclusive; `end` is exclusive, with `None` meaning
/// "to the end of the keyspace".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanRange {
    /// Inclusive lower bound.
    pub start: Vec<u8>,
    /// Exclusive upper bound; `None` scans to the end.
    pub end: Option<Vec<u8>>,
}

impl ScanRange {
    /// The range covering the whole keyspace.
    pub fn all() -> Self {
        ScanRange::default()
    }

    /// A range with explicit bounds.
    pub fn new(start: Vec<u8>, end: Option<Vec<u8>>) -> Self {
        ScanRange { start, end }
    }

    /// Whether `key` falls inside this range.
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().map_or(true, |end| key < end)
    }
}

/// A single operation recorded in a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    /// Set `key` to `value`.
    Put {
        /// Key to write.
        key: Vec<u8>,
        /// Value to write.
        value: Vec<u8>,
    },
    /// Remove `key`.
    Delete {
        /// Key to remove.
        key: Vec<u8>,
    },
}

/// An accumulator of puts and deletes applied atomically by
/// [`Engine::apply_batch`]: either every operation becomes durable or
/// none does.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Record a put.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Record a delete.
    pub fn delete(&mut self, key: &[u8]) {
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch records nothing.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the batch, yielding its operations in insertion order.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// An ordered key-value storage engine.
///
/// Implementations wrap an embedded store (the stock one is
/// `shale_engine::RedbEngine`). All operations are ordinary blocking
/// calls.
pub trait Engine: Send + Sync {
    /// Get the current value for `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Durably set `key` to `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Durably remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Whether `key` currently exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate pairs inside `range` in ascending byte order.
    ///
    /// The iterator observes the engine state as of the call; later
    /// writes are not guaranteed to appear.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be started.
    fn iter(&self, range: ScanRange) -> Result<KvIter>;

    /// Acquire an immutable point-in-time read view.
    ///
    /// # Errors
    ///
    /// Returns an error if the view cannot be created.
    fn snapshot(&self) -> Result<Box<dyn Snapshot>>;

    /// Apply every operation in `batch` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; on error none of the
    /// operations are applied.
    fn apply_batch(&self, batch: WriteBatch) -> Result<()>;

    /// Filesystem root of the engine's storage, or `None` for purely
    /// in-memory engines. Used for disk usage accounting.
    fn path(&self) -> Option<&Path>;
}

/// An immutable point-in-time view of an [`Engine`].
///
/// Writes applied to the engine after the snapshot was taken are never
/// visible through it. Dropping the snapshot releases it.
pub trait Snapshot: Send + Sync {
    /// Get the value for `key` as of the snapshot, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Whether `key` existed as of the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate pairs inside `range`, in ascending byte order, as of the
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be started.
    fn iter(&self, range: ScanRange) -> Result<KvIter>;
}

//! Snapshot-isolated transactions
//!
//! A [`Transaction`] pairs an immutable engine snapshot, fixed at
//! creation, with an overlay of pending mutations. Reads consult the
//! overlay first (read-your-own-writes) and fall through to the
//! snapshot; queries merge both sides in key order. Nothing touches the
//! engine until [`Transaction::commit`] flushes the overlay as one
//! atomic batch.
//!
//! # Lifecycle
//!
//! `Active` is the initial state; `Committed` and `Discarded` are
//! terminal and permanent. Operations against a terminal transaction
//! fail with `Error::TransactionClosed`, except [`Transaction::discard`]
//! which is an idempotent no-op so cleanup can always run after a
//! successful commit. A failed commit leaves the transaction Active so
//! the caller can inspect state and then discard explicitly.
//!
//! # Isolation
//!
//! Writes committed by other transactions or by direct datastore
//! operations after this transaction's snapshot was taken are never
//! visible here. Commits are atomic but not serializable with respect
//! to each other: the last committed write for a key wins, and no
//! conflict detection is performed.

use crate::datastore::StoreInner;
use crate::merge::MergedScan;
use crate::overlay::{self, Mutation, Overlay};
use shale_core::error::{Error, Result};
use shale_core::key::Key;
use shale_core::query::{Query, Results};
use shale_core::traits::Snapshot;
use std::sync::Arc;
use tracing::trace;

/// Transaction lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxnStatus {
    /// Accepting operations.
    Active,
    /// Overlay applied to the engine; terminal.
    Committed,
    /// Overlay dropped without writing; terminal.
    Discarded,
}

/// A snapshot-isolated read/write transaction.
///
/// Obtained from `Datastore::new_transaction`. Single-owner: the write
/// API takes `&mut self` and the transaction is `Send` but not shared
/// between threads.
pub struct Transaction {
    store: Arc<StoreInner>,
    snapshot: Option<Box<dyn Snapshot>>,
    overlay: Overlay,
    status: TxnStatus,
    read_only: bool,
}

impl Transaction {
    pub(crate) fn new(
        store: Arc<StoreInner>,
        snapshot: Box<dyn Snapshot>,
        read_only: bool,
    ) -> Self {
        Transaction {
            store,
            snapshot: Some(snapshot),
            overlay: Overlay::new(),
            status: TxnStatus::Active,
            read_only,
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> TxnStatus {
        self.status
    }

    /// Whether this transaction rejects writes.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn ensure_active(&self) -> Result<()> {
        match self.status {
            TxnStatus::Active => Ok(()),
            _ => Err(Error::TransactionClosed),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_active()?;
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn snapshot_ref(&self) -> Result<&dyn Snapshot> {
        self.snapshot.as_deref().ok_or(Error::TransactionClosed)
    }

    /// Get the value for `key` in this transaction's view.
    ///
    /// # Errors
    ///
    /// `NotFound` if the key is absent or deleted in this transaction;
    /// `TransactionClosed` once terminal; engine errors from the
    /// snapshot read.
    pub fn get(&self, key: &Key) -> Result<Vec<u8>> {
        self.ensure_active()?;
        match self.overlay.get(key) {
            Some(Mutation::Put(value)) => Ok(value.clone()),
            Some(Mutation::Tombstone) => Err(Error::NotFound(key.clone())),
            None => match self.snapshot_ref()?.get(key.as_bytes())? {
                Some(value) => Ok(value),
                None => Err(Error::NotFound(key.clone())),
            },
        }
    }

    /// Whether `key` exists in this transaction's view.
    ///
    /// # Errors
    ///
    /// `TransactionClosed` once terminal; engine errors from the
    /// snapshot read.
    pub fn has(&self, key: &Key) -> Result<bool> {
        self.ensure_active()?;
        match self.overlay.get(key) {
            Some(Mutation::Put(_)) => Ok(true),
            Some(Mutation::Tombstone) => Ok(false),
            None => self.snapshot_ref()?.has(key.as_bytes()),
        }
    }

    /// Size in bytes of the value for `key` in this transaction's view.
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::get`].
    pub fn size(&self, key: &Key) -> Result<usize> {
        self.ensure_active()?;
        match self.overlay.get(key) {
            Some(Mutation::Put(value)) => Ok(value.len()),
            Some(Mutation::Tombstone) => Err(Error::NotFound(key.clone())),
            None => match self.snapshot_ref()?.get(key.as_bytes())? {
                Some(value) => Ok(value.len()),
                None => Err(Error::NotFound(key.clone())),
            },
        }
    }

    /// Record a pending write. The engine is untouched until commit.
    ///
    /// # Errors
    ///
    /// `TransactionClosed` once terminal; `ReadOnly` on a read-only
    /// transaction.
    pub fn put(&mut self, key: &Key, value: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.overlay
            .insert(key.clone(), Mutation::Put(value.to_vec()));
        Ok(())
    }

    /// Record a pending delete.
    ///
    /// # Errors
    ///
    /// `TransactionClosed` once terminal; `ReadOnly` on a read-only
    /// transaction.
    pub fn delete(&mut self, key: &Key) -> Result<()> {
        self.ensure_writable()?;
        self.overlay.insert(key.clone(), Mutation::Tombstone);
        Ok(())
    }

    /// Run a query over this transaction's merged view.
    ///
    /// The snapshot's bounded scan and the overlay's matching sub-range
    /// are merged in key order (overlay wins; tombstones suppress), then
    /// handed to the query pipeline. The overlay sub-range is captured
    /// when the scan starts, so later writes to this transaction do not
    /// appear in an already-open result sequence.
    ///
    /// # Errors
    ///
    /// `TransactionClosed` once terminal; `InvalidQuery` or engine
    /// errors from the pipeline.
    pub fn query(&self, query: Query) -> Result<Results> {
        self.ensure_active()?;
        let range = query
            .prefix
            .as_ref()
            .map(Key::descendant_range)
            .unwrap_or_default();
        let base = self.snapshot_ref()?.iter(range.clone())?;
        let pending = overlay::slice(&self.overlay, &range);
        query.execute(MergedScan::new(base, pending))
    }

    /// Atomically apply the overlay to the engine.
    ///
    /// On success the transaction transitions to Committed and releases
    /// its snapshot. On failure it stays Active with the overlay intact;
    /// the caller decides whether to retry via a new transaction and
    /// must discard this one.
    ///
    /// # Errors
    ///
    /// `TransactionClosed` once terminal; `Closed` if the datastore shut
    /// down since the transaction began; `Engine` if the batch write
    /// fails.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        let engine = self.store.engine()?;
        engine.apply_batch(overlay::to_write_batch(&self.overlay))?;
        trace!(mutations = self.overlay.len(), "transaction committed");
        self.status = TxnStatus::Committed;
        self.snapshot = None;
        self.overlay.clear();
        Ok(())
    }

    /// Drop the overlay and snapshot without writing anything.
    ///
    /// Idempotent: discarding a terminal transaction (including after a
    /// successful commit) is a no-op.
    pub fn discard(&mut self) {
        if self.status == TxnStatus::Active {
            self.status = TxnStatus::Discarded;
            self.snapshot = None;
            self.overlay.clear();
        }
    }
}

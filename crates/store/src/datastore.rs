//! Datastore facade
//!
//! [`Datastore`] owns the engine handle and the process-wide closed
//! state, and is the factory for [`Transaction`]s and [`Batch`]es. It is
//! a stateless pass-through otherwise: direct operations auto-commit
//! against the engine, and queries run over the live engine state with
//! no snapshot isolation.
//!
//! # Close coordination
//!
//! The engine handle lives behind an
//! `RwLock<Option<Arc<dyn Engine>>>`. Every operation clones the `Arc`
//! under a read lock and releases the lock before touching the engine;
//! `close` write-locks and takes the handle out. New acquisitions after
//! that fail with `Error::Closed`, while operations already holding a
//! clone run to completion against a live engine, which is destroyed
//! when the last clone drops. No lock is ever held across an engine
//! call, so close cannot deadlock against an in-flight commit.

use crate::batch::Batch;
use crate::transaction::Transaction;
use parking_lot::RwLock;
use shale_core::error::{Error, Result};
use shale_core::key::Key;
use shale_core::query::{Query, Results};
use shale_core::traits::{Engine, ScanRange};
use shale_engine::{usage, EngineConfig, RedbEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub(crate) struct StoreInner {
    engine: RwLock<Option<Arc<dyn Engine>>>,
    path: Option<PathBuf>,
}

impl StoreInner {
    /// Acquire the engine handle, failing once the datastore is closing.
    pub(crate) fn engine(&self) -> Result<Arc<dyn Engine>> {
        self.engine.read().as_ref().cloned().ok_or(Error::Closed)
    }
}

/// Shared handle to a datastore.
///
/// Cheap to clone; all clones share the engine and the closed state.
///
/// # Examples
///
/// ```no_run
/// use shale_store::Datastore;
/// use shale_core::Key;
///
/// # fn main() -> shale_core::Result<()> {
/// let ds = Datastore::open("/var/lib/my-app")?;
/// ds.put(&Key::new("/users/alice"), b"...")?;
/// let _value = ds.get(&Key::new("/users/alice"))?;
/// ds.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Datastore {
    inner: Arc<StoreInner>,
}

impl Datastore {
    /// Open (or create) a persistent datastore under `dir`.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot be opened.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(dir, EngineConfig::default())
    }

    /// Open (or create) a persistent datastore with explicit engine
    /// configuration.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot be opened.
    pub fn open_with_config(dir: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        Self::with_engine(RedbEngine::open_with_config(dir, config)?)
    }

    /// Create a fresh in-memory datastore.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        Self::with_engine(RedbEngine::in_memory()?)
    }

    /// Wrap an already-open engine.
    pub fn with_engine(engine: impl Engine + 'static) -> Result<Self> {
        let path = engine.path().map(Path::to_path_buf);
        debug!(path = ?path, "opened datastore");
        Ok(Datastore {
            inner: Arc::new(StoreInner {
                engine: RwLock::new(Some(Arc::new(engine))),
                path,
            }),
        })
    }

    /// Get the value for `key`.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `Closed` after close; engine errors.
    pub fn get(&self, key: &Key) -> Result<Vec<u8>> {
        match self.inner.engine()?.get(key.as_bytes())? {
            Some(value) => Ok(value),
            None => Err(Error::NotFound(key.clone())),
        }
    }

    /// Whether `key` exists.
    ///
    /// # Errors
    ///
    /// `Closed` after close; engine errors.
    pub fn has(&self, key: &Key) -> Result<bool> {
        self.inner.engine()?.has(key.as_bytes())
    }

    /// Size in bytes of the value for `key`.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `Closed` after close; engine errors.
    pub fn size(&self, key: &Key) -> Result<usize> {
        match self.inner.engine()?.get(key.as_bytes())? {
            Some(value) => Ok(value.len()),
            None => Err(Error::NotFound(key.clone())),
        }
    }

    /// Durably set `key` to `value`, auto-committing.
    ///
    /// # Errors
    ///
    /// `Closed` after close; engine errors.
    pub fn put(&self, key: &Key, value: &[u8]) -> Result<()> {
        self.inner.engine()?.put(key.as_bytes(), value)
    }

    /// Durably remove `key`, auto-committing. Removing an absent key is
    /// not an error.
    ///
    /// # Errors
    ///
    /// `Closed` after close; engine errors.
    pub fn delete(&self, key: &Key) -> Result<()> {
        self.inner.engine()?.delete(key.as_bytes())
    }

    /// Run a query over the live engine state.
    ///
    /// The result sequence reflects the engine as of the scan start;
    /// there is no snapshot isolation on this path. `query.prefix` is
    /// translated into a bounded engine scan.
    ///
    /// # Errors
    ///
    /// `Closed` after close; `InvalidQuery` or engine errors from the
    /// pipeline.
    pub fn query(&self, query: Query) -> Result<Results> {
        let engine = self.inner.engine()?;
        let range = query
            .prefix
            .as_ref()
            .map(Key::descendant_range)
            .unwrap_or_else(ScanRange::all);
        let iter = engine.iter(range)?;
        query.execute(iter.map(|item| item.map(|(key, value)| (Key::new(key), value))))
    }

    /// Begin a snapshot-isolated transaction.
    ///
    /// # Errors
    ///
    /// `Closed` once the datastore is closing or closed; engine errors
    /// acquiring the snapshot.
    pub fn new_transaction(&self, read_only: bool) -> Result<Transaction> {
        let engine = self.inner.engine()?;
        let snapshot = engine.snapshot()?;
        Ok(Transaction::new(self.inner.clone(), snapshot, read_only))
    }

    /// Create an empty write batch.
    ///
    /// # Errors
    ///
    /// `Closed` once the datastore is closing or closed.
    pub fn batch(&self) -> Result<Batch> {
        self.inner.engine()?;
        Ok(Batch::new(self.inner.clone()))
    }

    /// Total on-disk size of the backing storage, in bytes.
    ///
    /// Always zero for an in-memory datastore. Remains callable after
    /// close, failing once the storage directory is gone.
    ///
    /// # Errors
    ///
    /// `Io` if the storage directory cannot be walked.
    pub fn disk_usage(&self) -> Result<u64> {
        match &self.inner.path {
            Some(path) => Ok(usage::dir_size(path)?),
            None => Ok(0),
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.engine.read().is_none()
    }

    /// Close the datastore.
    ///
    /// From this point no new transactions, batches or operations can
    /// start; they fail with `Error::Closed`. Operations already in
    /// flight (including a racing transaction commit) either complete
    /// against the still-live engine or fail cleanly, never partially.
    /// The engine handle itself is destroyed when the last in-flight
    /// holder releases it. Idempotent: closing twice returns Ok.
    pub fn close(&self) -> Result<()> {
        let engine = self.inner.engine.write().take();
        if engine.is_some() {
            debug!(path = ?self.inner.path, "closed datastore");
        }
        Ok(())
    }
}

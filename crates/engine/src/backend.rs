//! redb-backed engine adapter
//!
//! [`RedbEngine`] implements the `shale-core` engine contract over
//! `redb`, an embedded single-file B-tree store. The mapping is thin:
//!
//! - point reads and scans go through short-lived read transactions
//! - point writes and batches each run in one write transaction, which
//!   redb applies atomically
//! - snapshots are read transactions kept open: redb is MVCC, so an
//!   open read transaction is a true point-in-time view
//!
//! A persistent engine lives in a single database file under the
//! directory passed to [`RedbEngine::open`]; the in-memory variant uses
//! redb's `InMemoryBackend` and reports no storage path.

use crate::config::EngineConfig;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadOnlyTable, ReadableTable, TableDefinition};
use shale_core::error::{Error, Result};
use shale_core::traits::{BatchOp, Engine, KvIter, ScanRange, Snapshot, WriteBatch};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::debug;

const DATA: TableDefinition<&[u8], &[u8]> = TableDefinition::new("shale");

/// Name of the database file created under the storage directory.
pub const DB_FILE: &str = "shale.redb";

/// Ordered storage engine backed by redb.
pub struct RedbEngine {
    db: Database,
    path: Option<PathBuf>,
}

impl RedbEngine {
    /// Open (or create) a persistent engine under `dir`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the database cannot
    /// be opened.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(dir, EngineConfig::default())
    }

    /// Open (or create) a persistent engine under `dir` with explicit
    /// configuration.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the database cannot
    /// be opened.
    pub fn open_with_config(dir: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut builder = Database::builder();
        if let Some(bytes) = config.cache_bytes {
            builder.set_cache_size(bytes);
        }
        let db = builder.create(dir.join(DB_FILE)).map_err(Error::engine)?;

        let engine = RedbEngine {
            db,
            path: Some(dir.to_path_buf()),
        };
        engine.ensure_table()?;
        debug!(path = %dir.display(), "opened redb engine");
        Ok(engine)
    }

    /// Create a fresh in-memory engine.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(Error::engine)?;
        let engine = RedbEngine { db, path: None };
        engine.ensure_table()?;
        Ok(engine)
    }

    // The data table must exist before the first read transaction opens it.
    fn ensure_table(&self) -> Result<()> {
        let txn = self.db.begin_write().map_err(Error::engine)?;
        txn.open_table(DATA).map_err(Error::engine)?;
        txn.commit().map_err(Error::engine)?;
        Ok(())
    }

    fn read_table(&self) -> Result<ReadOnlyTable<&'static [u8], &'static [u8]>> {
        let txn = self.db.begin_read().map_err(Error::engine)?;
        txn.open_table(DATA).map_err(Error::engine)
    }
}

fn range_iter(
    table: &ReadOnlyTable<&'static [u8], &'static [u8]>,
    range: &ScanRange,
) -> Result<KvIter> {
    let start = Bound::Included(range.start.as_slice());
    let end = match range.end.as_deref() {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    };
    let iter = table.range::<&[u8]>((start, end)).map_err(Error::engine)?;
    Ok(Box::new(iter.map(|item| {
        item.map(|(key, value)| (key.value().to_vec(), value.value().to_vec()))
            .map_err(Error::engine)
    })))
}

impl Engine for RedbEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.read_table()?;
        let value = table.get(key).map_err(Error::engine)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let txn = self.db.begin_write().map_err(Error::engine)?;
        {
            let mut table = txn.open_table(DATA).map_err(Error::engine)?;
            table.insert(key, value).map_err(Error::engine)?;
        }
        txn.commit().map_err(Error::engine)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let txn = self.db.begin_write().map_err(Error::engine)?;
        {
            let mut table = txn.open_table(DATA).map_err(Error::engine)?;
            table.remove(key).map_err(Error::engine)?;
        }
        txn.commit().map_err(Error::engine)?;
        Ok(())
    }

    fn iter(&self, range: ScanRange) -> Result<KvIter> {
        let table = self.read_table()?;
        range_iter(&table, &range)
    }

    fn snapshot(&self) -> Result<Box<dyn Snapshot>> {
        Ok(Box::new(RedbSnapshot {
            table: self.read_table()?,
        }))
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
        let txn = self.db.begin_write().map_err(Error::engine)?;
        {
            let mut table = txn.open_table(DATA).map_err(Error::engine)?;
            for op in batch.into_ops() {
                match op {
                    BatchOp::Put { key, value } => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(Error::engine)?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice()).map_err(Error::engine)?;
                    }
                }
            }
        }
        txn.commit().map_err(Error::engine)?;
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Point-in-time view backed by an open redb read transaction.
struct RedbSnapshot {
    table: ReadOnlyTable<&'static [u8], &'static [u8]>,
}

impl Snapshot for RedbSnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.table.get(key).map_err(Error::engine)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn iter(&self, range: ScanRange) -> Result<KvIter> {
        range_iter(&self.table, &range)
    }
}
